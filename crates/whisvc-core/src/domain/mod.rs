//! Domain types for provisioning the inference service.
//!
//! Pure data and classification rules; persistence and OS access go through
//! the traits in [`crate::ports`].

mod capability;
mod model;
mod phase;
mod port;
mod privilege;
mod service;
mod state;

pub use capability::{
    ArchitectureFamily, CapabilityReport, CapabilityVersion, ParsedCapability, Recommendation,
};
pub use model::{ModelTier, ModelTierParseError};
pub use phase::{InstallPhase, UninstallPhase};
pub use port::PortDisposition;
pub use privilege::{ElevatedToken, Privilege};
pub use service::{ServiceRegistration, ServiceStatus, StartupType};
pub use state::{AccelerationChoice, InstallationState, ServicePort, StateError};
