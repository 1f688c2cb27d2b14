//! Per-run install logs.

mod install_log;

pub use install_log::{InstallLog, InstallLogWriter, LogError, LogLocations, append_with_retry};
