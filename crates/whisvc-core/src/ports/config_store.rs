//! Persistent configuration port.
//!
//! Two scopes are kept per service. The environment scope is what the
//! service process reads at start; the installation scope is what the next
//! install or uninstall reads to learn about this one.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use super::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigScope {
    Environment,
    Installation,
}

impl ConfigScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Installation => "installation",
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to {operation} {scope} config for '{service}': {reason}")]
    Io {
        operation: &'static str,
        scope: ConfigScope,
        service: String,
        reason: String,
    },

    #[error("Config value for '{key}' cannot be stored: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Key/value storage scoped by service name.
///
/// Writes are per key. Replacing a whole record is `clear` followed by a
/// write for every key.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn read(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
    ) -> Result<Option<String>, ConfigError>;

    /// All keys of a scope; empty when the scope does not exist.
    async fn read_all(
        &self,
        service: &str,
        scope: ConfigScope,
    ) -> Result<BTreeMap<String, String>, ConfigError>;

    async fn write(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError>;

    /// Remove every key of a scope. Clearing a missing scope succeeds.
    async fn clear(&self, service: &str, scope: ConfigScope) -> Result<(), ConfigError>;

    /// Where this store keeps `scope`, for summaries.
    fn describe(&self, service: &str, scope: ConfigScope) -> String;
}
