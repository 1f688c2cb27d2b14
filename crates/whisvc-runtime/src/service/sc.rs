//! Windows service control through `sc.exe`.
//!
//! Exit codes are Win32 error numbers. The ones treated as success are the
//! "already in the requested state" family, so `stop` and `remove` on a
//! missing service are no-ops.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use whisvc_core::{
    CommandOutput, CommandRunner, CommandSpec, ServiceError, ServiceManager, ServiceRegistration,
    ServiceStatus, StartupType,
};

use crate::command::run_logged;

const ERROR_SERVICE_ALREADY_RUNNING: i32 = 1056;
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;
const ERROR_SERVICE_NOT_ACTIVE: i32 = 1062;
const ERROR_SERVICE_MARKED_FOR_DELETE: i32 = 1072;

const SC_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ScServiceManager {
    runner: Arc<dyn CommandRunner>,
}

impl ScServiceManager {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn sc<I, S>(&self, args: I) -> Result<CommandOutput, ServiceError>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<String>,
    {
        let spec = CommandSpec::new("sc.exe").args(args).timeout(SC_TIMEOUT);
        Ok(run_logged(self.runner.as_ref(), &spec).await?)
    }
}

fn exit_is(out: &CommandOutput, codes: &[i32]) -> bool {
    out.code.is_some_and(|c| codes.contains(&c))
}

/// Parse the `STATE` line of `sc query` output.
pub fn parse_sc_state(output: &str) -> ServiceStatus {
    let Some(line) = output
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("STATE"))
    else {
        return ServiceStatus::Unknown(String::new());
    };
    let state = line
        .split_once(':')
        .map_or("", |(_, rest)| rest.trim())
        .split_whitespace()
        .nth(1)
        .unwrap_or_default();
    match state {
        "RUNNING" => ServiceStatus::Running,
        "STOPPED" => ServiceStatus::Stopped,
        "START_PENDING" => ServiceStatus::StartPending,
        "STOP_PENDING" => ServiceStatus::StopPending,
        other => ServiceStatus::Unknown(other.to_string()),
    }
}

/// Executable from the `BINARY_PATH_NAME` line of `sc qc` output.
pub fn parse_binary_path(output: &str) -> Option<PathBuf> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("BINARY_PATH_NAME"))?;
    let (_, value) = line.split_once(':')?;
    let value = value.trim();

    let exe = if let Some(rest) = value.strip_prefix('"') {
        rest.split('"').next()?
    } else {
        value.split_whitespace().next()?
    };
    (!exe.is_empty()).then(|| PathBuf::from(exe))
}

#[async_trait]
impl ServiceManager for ScServiceManager {
    async fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError> {
        let out = self.sc(["query", name]).await?;
        if exit_is(&out, &[ERROR_SERVICE_DOES_NOT_EXIST]) {
            return Ok(ServiceStatus::NotInstalled);
        }
        if !out.success() {
            return Err(ServiceError::failed("query", name, out.detail()));
        }
        Ok(parse_sc_state(&out.stdout))
    }

    async fn stop(&self, name: &str) -> Result<(), ServiceError> {
        let out = self.sc(["stop", name]).await?;
        if out.success() || exit_is(&out, &[ERROR_SERVICE_NOT_ACTIVE, ERROR_SERVICE_DOES_NOT_EXIST]) {
            return Ok(());
        }
        Err(ServiceError::failed("stop", name, out.detail()))
    }

    async fn start(&self, name: &str) -> Result<(), ServiceError> {
        let out = self.sc(["start", name]).await?;
        if out.success() || exit_is(&out, &[ERROR_SERVICE_ALREADY_RUNNING]) {
            return Ok(());
        }
        Err(ServiceError::failed("start", name, out.detail()))
    }

    async fn create(&self, registration: &ServiceRegistration) -> Result<(), ServiceError> {
        let name = registration.name.as_str();
        let out = self
            .sc([
                "create".to_string(),
                name.to_string(),
                "binPath=".to_string(),
                registration.command_line(),
                "DisplayName=".to_string(),
                registration.display_name.clone(),
                "start=".to_string(),
                registration.startup.sc_value().to_string(),
            ])
            .await?;
        if !out.success() {
            return Err(ServiceError::failed("create", name, out.detail()));
        }
        Ok(())
    }

    async fn set_description(&self, name: &str, description: &str) -> Result<(), ServiceError> {
        let out = self.sc(["description", name, description]).await?;
        if !out.success() {
            return Err(ServiceError::failed("describe", name, out.detail()));
        }
        Ok(())
    }

    async fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), ServiceError> {
        let out = self.sc(["config", name, "start=", startup.sc_value()]).await?;
        if !out.success() {
            return Err(ServiceError::failed("configure", name, out.detail()));
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ServiceError> {
        let out = self.sc(["delete", name]).await?;
        if out.success()
            || exit_is(&out, &[ERROR_SERVICE_DOES_NOT_EXIST, ERROR_SERVICE_MARKED_FOR_DELETE])
        {
            return Ok(());
        }
        Err(ServiceError::failed("delete", name, out.detail()))
    }

    async fn purge(&self, name: &str) -> Result<(), ServiceError> {
        let key = format!(r"HKLM\SYSTEM\CurrentControlSet\Services\{name}");
        let spec = CommandSpec::new("reg.exe")
            .args(["delete", key.as_str(), "/f"])
            .timeout(SC_TIMEOUT);
        let out = run_logged(self.runner.as_ref(), &spec).await?;
        if !out.success() {
            return Err(ServiceError::failed("purge", name, out.detail()));
        }
        debug!(service = name, "Registration key deleted");
        Ok(())
    }

    async fn configured_binary(&self, name: &str) -> Result<Option<PathBuf>, ServiceError> {
        let out = self.sc(["qc", name]).await?;
        if exit_is(&out, &[ERROR_SERVICE_DOES_NOT_EXIST]) {
            return Ok(None);
        }
        if !out.success() {
            return Err(ServiceError::failed("query config of", name, out.detail()));
        }
        Ok(parse_binary_path(&out.stdout))
    }

    fn log_paths(&self, _name: &str, install_path: &Path) -> Vec<PathBuf> {
        let logs = install_path.join("logs");
        vec![logs.join("stdout.log"), logs.join("stderr.log")]
    }
}
