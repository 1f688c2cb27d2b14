//! File-backed config store.
//!
//! Layout: `<root>/<service>/<scope>.env`, one `KEY=value` per line. The
//! environment file doubles as the systemd `EnvironmentFile=`, so the format
//! stays within what systemd parses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use whisvc_core::{ConfigError, ConfigScope, ConfigStore};

/// Path of the file holding `scope` for `service`.
pub fn scope_file(root: &Path, service: &str, scope: ConfigScope) -> PathBuf {
    root.join(service).join(format!("{}.env", scope.as_str()))
}

pub struct EnvFileConfigStore {
    root: PathBuf,
}

impl EnvFileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn io_error(
        operation: &'static str,
        service: &str,
        scope: ConfigScope,
        e: &std::io::Error,
    ) -> ConfigError {
        ConfigError::Io {
            operation,
            scope,
            service: service.to_string(),
            reason: e.to_string(),
        }
    }

    async fn load(
        &self,
        service: &str,
        scope: ConfigScope,
    ) -> Result<Vec<(String, String)>, ConfigError> {
        let path = scope_file(&self.root, service, scope);
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(parse_lines(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Self::io_error("read", service, scope, &e)),
        }
    }
}

fn parse_lines(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .collect()
}

fn validate(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() || key.contains(['=', '\n', '\r', ' ']) {
        return Err(invalid("keys must be non-empty and contain no '=', spaces or line breaks"));
    }
    if value.contains(['\n', '\r']) {
        return Err(invalid("values cannot span lines"));
    }
    Ok(())
}

#[async_trait]
impl ConfigStore for EnvFileConfigStore {
    async fn read(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        Ok(self
            .load(service, scope)
            .await?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    async fn read_all(
        &self,
        service: &str,
        scope: ConfigScope,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(self.load(service, scope).await?.into_iter().collect())
    }

    async fn write(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        validate(key, value)?;

        let mut entries = self.load(service, scope).await?;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }

        let path = scope_file(&self.root, service, scope);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error("create", service, scope, &e))?;
        }

        let mut text = String::new();
        for (k, v) in &entries {
            text.push_str(k);
            text.push('=');
            text.push_str(v);
            text.push('\n');
        }

        // Write beside the target and rename, so readers never see half a file.
        let staging = path.with_extension("env.tmp");
        fs::write(&staging, text)
            .await
            .map_err(|e| Self::io_error("write", service, scope, &e))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| Self::io_error("write", service, scope, &e))?;
        debug!(service, %scope, key, "Config key written");
        Ok(())
    }

    async fn clear(&self, service: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        let path = scope_file(&self.root, service, scope);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Self::io_error("clear", service, scope, &e)),
        }

        // Drop the service directory once both scopes are gone.
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir(dir).await;
        }
        Ok(())
    }

    fn describe(&self, service: &str, scope: ConfigScope) -> String {
        scope_file(&self.root, service, scope).display().to_string()
    }
}
