//! Registry-backed config store, driven through `reg.exe`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use whisvc_core::{CommandOutput, CommandRunner, CommandSpec, ConfigError, ConfigScope, ConfigStore};

use crate::command::run_logged;

const REG_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry key holding `scope` for `service`.
///
/// The environment block lives under the service's own key, where the
/// service host script reads it on start.
pub fn registry_key(service: &str, scope: ConfigScope) -> String {
    match scope {
        ConfigScope::Environment => {
            format!(r"HKLM\SYSTEM\CurrentControlSet\Services\{service}\Environment")
        }
        ConfigScope::Installation => format!(r"HKLM\SOFTWARE\whisvc\{service}"),
    }
}

/// Name/value pairs of `REG_SZ` lines in `reg query` output.
pub fn parse_reg_query(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let (name, rest) = line.trim().split_once("REG_SZ")?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), rest.trim().to_string()))
        })
        .collect()
}

pub struct RegistryConfigStore {
    runner: Arc<dyn CommandRunner>,
}

impl RegistryConfigStore {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn reg(&self, args: Vec<String>) -> Result<CommandOutput, ConfigError> {
        let spec = CommandSpec::new("reg.exe").args(args).timeout(REG_TIMEOUT);
        Ok(run_logged(self.runner.as_ref(), &spec).await?)
    }

    /// `reg query` exits 1 for a missing key or value; both read as empty.
    async fn query(
        &self,
        service: &str,
        scope: ConfigScope,
        value: Option<&str>,
    ) -> Result<Option<String>, ConfigError> {
        let mut args = vec!["query".to_string(), registry_key(service, scope)];
        if let Some(value) = value {
            args.extend(["/v".to_string(), value.to_string()]);
        }
        let out = self.reg(args).await?;
        match out.code {
            Some(0) => Ok(Some(out.stdout)),
            Some(1) => Ok(None),
            _ => Err(ConfigError::Io {
                operation: "read",
                scope,
                service: service.to_string(),
                reason: out.detail(),
            }),
        }
    }
}

#[async_trait]
impl ConfigStore for RegistryConfigStore {
    async fn read(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        Ok(self
            .query(service, scope, Some(key))
            .await?
            .and_then(|out| parse_reg_query(&out).remove(key)))
    }

    async fn read_all(
        &self,
        service: &str,
        scope: ConfigScope,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(self
            .query(service, scope, None)
            .await?
            .map(|out| parse_reg_query(&out))
            .unwrap_or_default())
    }

    async fn write(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let out = self
            .reg(vec![
                "add".to_string(),
                registry_key(service, scope),
                "/v".to_string(),
                key.to_string(),
                "/t".to_string(),
                "REG_SZ".to_string(),
                "/d".to_string(),
                value.to_string(),
                "/f".to_string(),
            ])
            .await?;
        if !out.success() {
            return Err(ConfigError::Io {
                operation: "write",
                scope,
                service: service.to_string(),
                reason: out.detail(),
            });
        }
        Ok(())
    }

    async fn clear(&self, service: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        if self.query(service, scope, None).await?.is_none() {
            return Ok(());
        }
        let out = self
            .reg(vec![
                "delete".to_string(),
                registry_key(service, scope),
                "/f".to_string(),
            ])
            .await?;
        if !out.success() {
            return Err(ConfigError::Io {
                operation: "clear",
                scope,
                service: service.to_string(),
                reason: out.detail(),
            });
        }
        Ok(())
    }

    fn describe(&self, service: &str, scope: ConfigScope) -> String {
        registry_key(service, scope)
    }
}
