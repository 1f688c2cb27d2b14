use std::io;
use std::path::PathBuf;

use thiserror::Error;
use whisvc_core::{ConfigError, PathError, PromptError, ServiceError};

use crate::lock::LockError;
use crate::logging::LogLocations;
use crate::python::{DependencyError, RuntimeError};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Administrator privileges are required; re-run from an elevated shell")]
    NotElevated,

    #[error("Unattended mode is not supported: model, port and acceleration need an operator")]
    UnattendedUnsupported,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to {operation} {path}: {source}")]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub(crate) fn fs(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Terminal state of a failed flow.
#[derive(Debug, Error)]
#[error("{phase} failed: {error}")]
pub struct InstallFailure {
    /// Name of the phase that was running.
    pub phase: &'static str,
    #[source]
    pub error: InstallError,
    pub logs: LogLocations,
}

impl InstallFailure {
    pub fn primary_log(&self) -> &std::path::Path {
        &self.logs.primary
    }

    pub fn secondary_log(&self) -> Option<&std::path::Path> {
        self.logs.secondary.as_deref()
    }
}
