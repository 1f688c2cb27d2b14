//! Persisted installation facts.
//!
//! [`InstallationState`] is the single record the installer keeps about a
//! service: where it lives, which model and port it serves, and whether the
//! accelerated build was chosen. It is stored in two scopes of a
//! [`ConfigStore`]: the service's environment block (read by the service on
//! start) and the installation record (read by the next install or uninstall).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::capability::CapabilityReport;
use super::model::ModelTier;
use crate::ports::{ConfigError, ConfigScope, ConfigStore};
use crate::settings::{BIND_ADDRESS, DEFAULT_DEVICE_ID, DEFAULT_PORT, env_keys, install_keys};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("port {0} is outside the allowed range 1024-65535")]
    PortOutOfRange(u32),

    #[error("'{0}' is not a port number")]
    PortNotNumeric(String),

    #[error("installation record is missing '{0}'")]
    MissingField(&'static str),

    #[error("installation record has an invalid '{field}': {value}")]
    InvalidField { field: &'static str, value: String },
}

/// A TCP port in the unprivileged range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ServicePort(u16);

impl ServicePort {
    pub const MIN: u16 = 1024;

    pub fn new(port: u16) -> Result<Self, StateError> {
        if port < Self::MIN {
            return Err(StateError::PortOutOfRange(u32::from(port)));
        }
        Ok(Self(port))
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl Default for ServicePort {
    fn default() -> Self {
        Self(DEFAULT_PORT)
    }
}

impl FromStr for ServicePort {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: u32 = trimmed
            .parse()
            .map_err(|_| StateError::PortNotNumeric(trimmed.to_string()))?;
        let port = u16::try_from(value).map_err(|_| StateError::PortOutOfRange(value))?;
        Self::new(port)
    }
}

impl fmt::Display for ServicePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the accelerated build is in use, and on which device.
///
/// A freshly made choice can only be enabled through
/// [`AccelerationChoice::from_report`], which requires a compatible report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccelerationChoice {
    enabled: bool,
    device_id: u32,
}

impl AccelerationChoice {
    pub const fn cpu() -> Self {
        Self {
            enabled: false,
            device_id: DEFAULT_DEVICE_ID,
        }
    }

    /// Enable acceleration only if the hardware qualifies and the operator agreed.
    pub const fn from_report(report: &CapabilityReport, operator_confirmed: bool) -> Self {
        Self {
            enabled: report.compatible() && operator_confirmed,
            device_id: DEFAULT_DEVICE_ID,
        }
    }

    pub const fn enabled(self) -> bool {
        self.enabled
    }

    pub const fn device_id(self) -> u32 {
        self.device_id
    }

    /// Value stored under the `acceleration` key.
    pub const fn label(self) -> &'static str {
        if self.enabled { "cuda" } else { "cpu" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationState {
    pub service_name: String,
    pub install_path: PathBuf,
    pub runtime_path: PathBuf,
    pub model: ModelTier,
    pub port: ServicePort,
    pub acceleration: AccelerationChoice,
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstallationState {
    /// The four keys of the service environment block, in write order.
    pub fn environment_entries(&self) -> Vec<(String, String)> {
        vec![
            (env_keys::MODEL.to_string(), self.model.to_string()),
            (env_keys::PORT.to_string(), self.port.to_string()),
            (env_keys::HOST.to_string(), BIND_ADDRESS.to_string()),
            (
                env_keys::DEVICE_ID.to_string(),
                self.acceleration.device_id().to_string(),
            ),
        ]
    }

    fn installation_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            (
                install_keys::INSTALL_PATH,
                self.install_path.to_string_lossy().into_owned(),
            ),
            (
                install_keys::RUNTIME_PATH,
                self.runtime_path.to_string_lossy().into_owned(),
            ),
            (install_keys::MODEL, self.model.to_string()),
            (install_keys::PORT, self.port.to_string()),
            (
                install_keys::ACCELERATION,
                self.acceleration.label().to_string(),
            ),
            (
                install_keys::DEVICE_ID,
                self.acceleration.device_id().to_string(),
            ),
        ];
        if let Some(at) = self.installed_at {
            entries.push((install_keys::INSTALLED_AT, at.to_rfc3339()));
        }
        entries
    }

    /// Replace the installation record for this service, one key at a time.
    ///
    /// The scope is cleared first so keys written by an older version do not
    /// survive the rewrite. The service environment block is left alone; it
    /// belongs to the registration and is only written once the previous
    /// registration is confirmed gone.
    pub async fn persist(&self, store: &dyn ConfigStore) -> Result<(), ConfigError> {
        store
            .clear(&self.service_name, ConfigScope::Installation)
            .await?;
        for (key, value) in self.installation_entries() {
            store
                .write(&self.service_name, ConfigScope::Installation, key, &value)
                .await?;
        }
        Ok(())
    }

    /// Load the installation record for `service_name`.
    ///
    /// Returns `Ok(None)` when no record exists. A record that exists but
    /// cannot be parsed is logged and treated as absent, so a damaged record
    /// never blocks a reinstall.
    pub async fn load(
        store: &dyn ConfigStore,
        service_name: &str,
    ) -> Result<Option<Self>, ConfigError> {
        let record = store
            .read_all(service_name, ConfigScope::Installation)
            .await?;
        if record.is_empty() {
            return Ok(None);
        }

        match Self::from_record(service_name, &record) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(service = %service_name, error = %e, "Ignoring unreadable installation record");
                Ok(None)
            }
        }
    }

    fn from_record(
        service_name: &str,
        record: &std::collections::BTreeMap<String, String>,
    ) -> Result<Self, StateError> {
        let field = |key: &'static str| {
            record
                .get(key)
                .map(String::as_str)
                .ok_or(StateError::MissingField(key))
        };

        let model = field(install_keys::MODEL)?
            .parse::<ModelTier>()
            .map_err(|e| StateError::InvalidField {
                field: install_keys::MODEL,
                value: e.0,
            })?;
        let port = field(install_keys::PORT)?.parse::<ServicePort>()?;

        let enabled = match field(install_keys::ACCELERATION)? {
            "cuda" => true,
            "cpu" => false,
            other => {
                return Err(StateError::InvalidField {
                    field: install_keys::ACCELERATION,
                    value: other.to_string(),
                });
            }
        };
        let device_id = match record.get(install_keys::DEVICE_ID) {
            Some(raw) => raw.parse::<u32>().map_err(|_| StateError::InvalidField {
                field: install_keys::DEVICE_ID,
                value: raw.clone(),
            })?,
            None => DEFAULT_DEVICE_ID,
        };

        let installed_at = record
            .get(install_keys::INSTALLED_AT)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));

        Ok(Self {
            service_name: service_name.to_string(),
            install_path: PathBuf::from(field(install_keys::INSTALL_PATH)?),
            runtime_path: PathBuf::from(field(install_keys::RUNTIME_PATH)?),
            model,
            port,
            acceleration: AccelerationChoice { enabled, device_id },
            installed_at,
        })
    }

    /// Port recorded by the most recent install, read without requiring the
    /// rest of the record to be valid.
    pub async fn previous_port(
        store: &dyn ConfigStore,
        service_name: &str,
    ) -> Result<Option<u16>, ConfigError> {
        let raw = store
            .read(service_name, ConfigScope::Installation, install_keys::PORT)
            .await?;
        Ok(raw.and_then(|value| value.trim().parse::<u16>().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapabilityVersion, ParsedCapability};
    use crate::testing::MemoryConfigStore;

    fn sample_state() -> InstallationState {
        InstallationState {
            service_name: "whisper-api".to_string(),
            install_path: PathBuf::from("/opt/whisper-api"),
            runtime_path: PathBuf::from("/opt/whisper-api/python"),
            model: ModelTier::Medium,
            port: ServicePort::new(5050).unwrap(),
            acceleration: AccelerationChoice::cpu(),
            installed_at: None,
        }
    }

    #[test]
    fn port_range_is_enforced() {
        assert!(ServicePort::new(1023).is_err());
        assert!(ServicePort::new(1024).is_ok());
        assert!(ServicePort::new(65535).is_ok());
        assert_eq!(
            "70000".parse::<ServicePort>(),
            Err(StateError::PortOutOfRange(70000))
        );
        assert!(matches!(
            "http".parse::<ServicePort>(),
            Err(StateError::PortNotNumeric(_))
        ));
    }

    #[test]
    fn acceleration_requires_compatible_report() {
        let old = CapabilityReport::classify(
            "GTX 1080",
            "535",
            ParsedCapability::Version(CapabilityVersion::new(6, 1)),
        );
        assert!(!AccelerationChoice::from_report(&old, true).enabled());

        let new = CapabilityReport::classify(
            "RTX 3060",
            "535",
            ParsedCapability::Version(CapabilityVersion::new(8, 6)),
        );
        assert!(AccelerationChoice::from_report(&new, true).enabled());
        assert!(!AccelerationChoice::from_report(&new, false).enabled());
    }

    #[test]
    fn environment_block_has_four_keys_and_loopback_host() {
        let entries = sample_state().environment_entries();
        assert_eq!(entries.len(), 4);
        assert!(entries.contains(&("WHISPER_HOST".to_string(), "127.0.0.1".to_string())));
        assert!(entries.contains(&("WHISPER_PORT".to_string(), "5050".to_string())));
    }

    #[tokio::test]
    async fn persist_then_load_returns_same_state() {
        let store = MemoryConfigStore::default();
        let state = sample_state();
        state.persist(&store).await.unwrap();

        let loaded = InstallationState::load(&store, "whisper-api")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, state);
        assert_eq!(
            InstallationState::previous_port(&store, "whisper-api")
                .await
                .unwrap(),
            Some(5050)
        );
    }

    #[tokio::test]
    async fn persist_drops_stale_keys() {
        let store = MemoryConfigStore::default();
        store
            .write("whisper-api", ConfigScope::Installation, "legacy_flag", "1")
            .await
            .unwrap();

        sample_state().persist(&store).await.unwrap();

        let record = store
            .read_all("whisper-api", ConfigScope::Installation)
            .await
            .unwrap();
        assert!(!record.contains_key("legacy_flag"));
        assert!(record.contains_key("port"));
    }

    #[tokio::test]
    async fn persist_leaves_service_environment_untouched() {
        let store = MemoryConfigStore::default();
        store
            .write("whisper-api", ConfigScope::Environment, "WHISPER_PORT", "5000")
            .await
            .unwrap();

        sample_state().persist(&store).await.unwrap();

        let env = store
            .read_all("whisper-api", ConfigScope::Environment)
            .await
            .unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("WHISPER_PORT").map(String::as_str), Some("5000"));
    }

    #[tokio::test]
    async fn damaged_record_loads_as_absent() {
        let store = MemoryConfigStore::default();
        store
            .write("whisper-api", ConfigScope::Installation, "port", "not-a-port")
            .await
            .unwrap();

        assert!(
            InstallationState::load(&store, "whisper-api")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            InstallationState::previous_port(&store, "whisper-api")
                .await
                .unwrap(),
            None
        );
    }
}
