//! Core domain types and port definitions for whisvc.
//!
//! This crate is pure: it owns the installation data model, the capability
//! classification rules, and the trait seams (ports) through which the
//! runtime crate touches the operating system. Nothing in here spawns a
//! process, opens a socket, or edits the service database.

#![deny(unsafe_code)]

pub mod domain;
pub mod paths;
pub mod ports;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    AccelerationChoice, ArchitectureFamily, CapabilityReport, CapabilityVersion, ElevatedToken,
    InstallPhase, InstallationState, ModelTier, ParsedCapability, PortDisposition, Privilege,
    Recommendation, ServicePort, ServiceRegistration, ServiceStatus, StartupType, StateError,
    UninstallPhase,
};
pub use paths::{InstallLayout, PathError, config_root, default_install_path};
pub use ports::{
    ArchiveFetcher, CommandError, CommandOutput, CommandRunner, CommandSpec, ConfigError,
    ConfigScope, ConfigStore, FetchError, HostProbe, OperatorPrompt, ProcessInfo, ProcessTable,
    ProgressError, ProgressSink, PromptError, ServiceError, ServiceManager, processes_under,
};
