//! CLI-specific error types and exit code mapping.

use thiserror::Error;
use whisvc_core::{ConfigError, PathError};
use whisvc_runtime::{InstallFailure, LogError};

#[derive(Debug, Error)]
pub enum CliError {
    /// An install or uninstall flow stopped in one of its phases.
    #[error(transparent)]
    Flow(#[from] Box<InstallFailure>),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Map error to the process exit code.
    ///
    /// - 0: success, including success with warnings (never produced here)
    /// - 1: any fatal flow or environment error
    /// - 2: misuse of the command line
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(_) => 2,
            Self::Flow(_) | Self::Log(_) | Self::Path(_) | Self::Config(_) | Self::Other(_) => 1,
        }
    }
}

impl From<InstallFailure> for CliError {
    fn from(failure: InstallFailure) -> Self {
        Self::Flow(Box::new(failure))
    }
}
