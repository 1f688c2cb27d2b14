//! Named states of the install and uninstall flows.
//!
//! Both flows are forward-only; a failure records the phase it happened in.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InstallPhase {
    Preflight,
    Configure,
    DetectCapability,
    ProvisionRuntime,
    InstallDependencies,
    ProvisionService,
    Activate,
    Summarize,
}

impl InstallPhase {
    pub const ALL: [Self; 8] = [
        Self::Preflight,
        Self::Configure,
        Self::DetectCapability,
        Self::ProvisionRuntime,
        Self::InstallDependencies,
        Self::ProvisionService,
        Self::Activate,
        Self::Summarize,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preflight => "Preflight",
            Self::Configure => "Configure",
            Self::DetectCapability => "DetectCapability",
            Self::ProvisionRuntime => "ProvisionRuntime",
            Self::InstallDependencies => "InstallDependencies",
            Self::ProvisionService => "ProvisionService",
            Self::Activate => "Activate",
            Self::Summarize => "Summarize",
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum UninstallPhase {
    StopService,
    RemoveRegistration,
    TerminateStrayProcesses,
    RemoveEnvironment,
    RemoveFiles,
    Summarize,
}

impl UninstallPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StopService => "StopService",
            Self::RemoveRegistration => "RemoveRegistration",
            Self::TerminateStrayProcesses => "TerminateStrayProcesses",
            Self::RemoveEnvironment => "RemoveEnvironment",
            Self::RemoveFiles => "RemoveFiles",
            Self::Summarize => "Summarize",
        }
    }
}

impl fmt::Display for UninstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
