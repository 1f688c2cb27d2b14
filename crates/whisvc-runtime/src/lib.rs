//! OS adapters and install orchestration for whisvc.
//!
//! Implements the ports of `whisvc-core` against the host (processes,
//! `sc.exe`/`reg.exe`, systemd, `nvidia-smi`, HTTP downloads) and sequences
//! them into the install and uninstall flows.
//!
//! # Structure
//!
//! - [`command`] - process-backed command runner and logged execution
//! - [`config`] - registry and env-file config stores
//! - [`service`] - service manager adapters and the service provisioner
//! - [`python`] - interpreter download, validation and package installs
//! - [`system`] - capability detection, port probing, processes, host facts
//! - [`install`] - the install and uninstall state machines
//! - [`logging`] - the per-run install log
//! - [`progress`] - optional terminal progress display

#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod health;
pub mod install;
pub mod lock;
pub mod logging;
pub mod progress;
pub mod python;
pub mod service;
pub mod system;

pub use command::{ProcessCommandRunner, run_logged};
pub use config::{EnvFileConfigStore, RegistryConfigStore};
pub use health::{DEFAULT_HEALTH_TIMEOUT, wait_for_health};
pub use install::{
    Adapters, InstallContext, InstallError, InstallFailure, InstallRequest, InstallSummary,
    Installer, UninstallRequest, UninstallSummary, Uninstaller,
};
pub use lock::{InstallLock, LockError};
pub use logging::{InstallLog, LogError, LogLocations};
pub use progress::{ProgressHandle, TerminalProgress};
pub use python::{
    DependencyInstaller, HttpArchiveFetcher, RuntimeHandle, RuntimeProvisioner, RuntimeSource,
};
pub use service::{ScServiceManager, ServiceProvisioner, StartOutcome, SystemdServiceManager};
pub use system::{CapabilityDetector, PortResolver, SysinfoProcessTable, SystemHostProbe};
