use std::path::PathBuf;

use serde::Serialize;
use whisvc_core::{AccelerationChoice, CapabilityReport, ModelTier, PortDisposition};

use crate::logging::LogLocations;
use crate::python::TorchVariant;
use crate::service::StartOutcome;

/// What a successful install did, and what the operator should look at.
#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub service_name: String,
    pub install_path: PathBuf,
    pub runtime_path: PathBuf,
    pub model: ModelTier,
    pub port: u16,
    pub port_disposition: PortDisposition,
    pub capability: CapabilityReport,
    pub acceleration: AccelerationChoice,
    pub torch: TorchVariant,
    pub runtime_reused: bool,
    pub start: StartOutcome,
    /// Degraded-but-continue conditions, in the order they were met.
    pub warnings: Vec<String>,
    pub logs: LogLocations,
    /// Where the service itself writes stdout and stderr.
    pub service_logs: Vec<PathBuf>,
    pub config_locations: Vec<String>,
}

impl InstallSummary {
    pub const fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UninstallSummary {
    pub service_name: String,
    pub install_path: PathBuf,
    pub was_registered: bool,
    pub was_running: bool,
    /// The registration had to be deleted from the service database directly.
    pub purged: bool,
    pub terminated: Vec<u32>,
    pub removed: Vec<PathBuf>,
    pub kept_install_dir: bool,
    pub warnings: Vec<String>,
    pub logs: LogLocations,
}

impl UninstallSummary {
    /// Nothing was installed to begin with.
    pub fn was_noop(&self) -> bool {
        !self.was_registered && self.terminated.is_empty() && self.removed.is_empty()
    }
}
