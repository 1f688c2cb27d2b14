//! Service registration record and observed status.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartupType {
    /// Started by the OS at boot.
    Automatic,
    Manual,
    Disabled,
}

impl StartupType {
    /// Value for `sc.exe config start=`.
    pub const fn sc_value(self) -> &'static str {
        match self {
            Self::Automatic => "auto",
            Self::Manual => "demand",
            Self::Disabled => "disabled",
        }
    }
}

/// Everything needed to (re)create the background service.
///
/// The record is always written whole: replacing a registration means
/// removing the old one and creating this one, never patching fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRegistration {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Executable the service manager launches.
    pub binary_path: PathBuf,
    pub arguments: Vec<String>,
    pub working_directory: PathBuf,
    pub startup: StartupType,
    /// Environment block, in write order.
    pub environment: Vec<(String, String)>,
}

impl ServiceRegistration {
    /// Full command line as the service database stores it.
    pub fn command_line(&self) -> String {
        let mut line = quote_if_needed(&self.binary_path.to_string_lossy());
        for arg in &self.arguments {
            line.push(' ');
            line.push_str(&quote_if_needed(arg));
        }
        line
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(' ') && !value.starts_with('"') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Observed state of a named service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    NotInstalled,
    Stopped,
    StartPending,
    StopPending,
    Running,
    /// Registered, but the state string was not recognised.
    Unknown(String),
}

impl ServiceStatus {
    /// A registration exists in the service database.
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::NotInstalled)
    }

    /// The process may be holding files open.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::StartPending | Self::StopPending)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => f.write_str("not installed"),
            Self::Stopped => f.write_str("stopped"),
            Self::StartPending => f.write_str("start pending"),
            Self::StopPending => f.write_str("stop pending"),
            Self::Running => f.write_str("running"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}
