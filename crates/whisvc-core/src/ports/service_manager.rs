//! OS service database port.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use super::{CommandError, ConfigError};
use crate::domain::{ServiceRegistration, ServiceStatus, StartupType};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to {operation} service '{name}': {detail}")]
    Failed {
        operation: &'static str,
        name: String,
        detail: String,
    },

    #[error("Service '{name}' is still registered after removal")]
    StillPresent { name: String },

    #[error("Service '{name}' did not stop within {seconds}s")]
    StopTimeout { name: String, seconds: u64 },
}

impl ServiceError {
    pub fn failed(operation: &'static str, name: &str, detail: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

/// Create, query and remove registrations in the host service manager.
///
/// `stop` and `remove` on a service that does not exist succeed; callers
/// use [`ServiceManager::status`] when they need to know.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError>;

    async fn stop(&self, name: &str) -> Result<(), ServiceError>;

    async fn start(&self, name: &str) -> Result<(), ServiceError>;

    async fn create(&self, registration: &ServiceRegistration) -> Result<(), ServiceError>;

    async fn set_description(&self, name: &str, description: &str) -> Result<(), ServiceError>;

    async fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), ServiceError>;

    async fn remove(&self, name: &str) -> Result<(), ServiceError>;

    /// Delete the registration record directly, bypassing the manager's
    /// normal removal path. Used when `remove` left it behind.
    async fn purge(&self, name: &str) -> Result<(), ServiceError>;

    /// Binary the existing registration launches, if one is registered.
    async fn configured_binary(&self, name: &str) -> Result<Option<PathBuf>, ServiceError>;

    /// Where the service writes its own stdout/stderr, if known.
    fn log_paths(&self, name: &str, install_path: &std::path::Path) -> Vec<PathBuf>;
}
