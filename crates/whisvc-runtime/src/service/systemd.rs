//! systemd unit management.
//!
//! The unit reads its environment from the environment scope file of the
//! [`EnvFileConfigStore`](crate::config::EnvFileConfigStore), so configuration
//! changes only need a restart, never a unit rewrite.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use whisvc_core::{
    CommandOutput, CommandRunner, CommandSpec, ConfigScope, ServiceError, ServiceManager,
    ServiceRegistration, ServiceStatus, StartupType,
};

use crate::command::run_logged;
use crate::config::scope_file;

const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
const SYSTEMCTL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct SystemdServiceManager {
    runner: Arc<dyn CommandRunner>,
    unit_dir: PathBuf,
    config_root: PathBuf,
}

impl SystemdServiceManager {
    /// `config_root` is the root of the file-backed config store.
    pub fn new(runner: Arc<dyn CommandRunner>, config_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
            config_root: config_root.into(),
        }
    }

    #[must_use]
    pub fn with_unit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unit_dir = dir.into();
        self
    }

    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{name}.service"))
    }

    async fn systemctl<I, S>(&self, args: I) -> Result<CommandOutput, ServiceError>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<String>,
    {
        let spec = CommandSpec::new("systemctl")
            .args(args)
            .timeout(SYSTEMCTL_TIMEOUT);
        Ok(run_logged(self.runner.as_ref(), &spec).await?)
    }

    async fn daemon_reload(&self) -> Result<(), ServiceError> {
        let out = self.systemctl(["daemon-reload"]).await?;
        if !out.success() {
            return Err(ServiceError::failed("reload units for", "systemd", out.detail()));
        }
        Ok(())
    }

    async fn delete_unit(&self, name: &str) -> Result<(), ServiceError> {
        match tokio::fs::remove_file(self.unit_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::failed("delete unit of", name, e.to_string())),
        }
    }
}

/// Unit file text for `registration`.
pub fn render_unit(registration: &ServiceRegistration, environment_file: &Path) -> String {
    let description = if registration.description.is_empty() {
        registration.display_name.as_str()
    } else {
        registration.description.as_str()
    };
    let logs = registration.working_directory.join("logs");

    format!(
        "[Unit]\n\
         Description={description}\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         WorkingDirectory={workdir}\n\
         EnvironmentFile=-{env_file}\n\
         ExecStart={exec}\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         StandardOutput=append:{stdout}\n\
         StandardError=append:{stderr}\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        workdir = registration.working_directory.display(),
        env_file = environment_file.display(),
        exec = registration.command_line(),
        stdout = logs.join("stdout.log").display(),
        stderr = logs.join("stderr.log").display(),
    )
}

fn parse_show(output: &str) -> ServiceStatus {
    let mut load = "";
    let mut active = "";
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("LoadState", v)) => load = v,
            Some(("ActiveState", v)) => active = v,
            _ => {}
        }
    }
    if load == "not-found" || load.is_empty() {
        return ServiceStatus::NotInstalled;
    }
    match active {
        "active" | "reloading" => ServiceStatus::Running,
        "activating" => ServiceStatus::StartPending,
        "deactivating" => ServiceStatus::StopPending,
        "inactive" | "failed" => ServiceStatus::Stopped,
        other => ServiceStatus::Unknown(other.to_string()),
    }
}

#[async_trait]
impl ServiceManager for SystemdServiceManager {
    async fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError> {
        let out = self
            .systemctl(["show", name, "--property=LoadState", "--property=ActiveState"])
            .await?;
        if !out.success() {
            return Err(ServiceError::failed("query", name, out.detail()));
        }
        Ok(parse_show(&out.stdout))
    }

    async fn stop(&self, name: &str) -> Result<(), ServiceError> {
        if !self.unit_path(name).exists() {
            return Ok(());
        }
        let out = self.systemctl(["stop", name]).await?;
        if !out.success() {
            return Err(ServiceError::failed("stop", name, out.detail()));
        }
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), ServiceError> {
        let out = self.systemctl(["start", name]).await?;
        if !out.success() {
            return Err(ServiceError::failed("start", name, out.detail()));
        }
        Ok(())
    }

    async fn create(&self, registration: &ServiceRegistration) -> Result<(), ServiceError> {
        let name = registration.name.as_str();
        let path = self.unit_path(name);
        if path.exists() {
            return Err(ServiceError::failed("create", name, "unit file already exists"));
        }

        let env_file = scope_file(&self.config_root, name, ConfigScope::Environment);
        let unit = render_unit(registration, &env_file);
        tokio::fs::create_dir_all(&self.unit_dir)
            .await
            .map_err(|e| ServiceError::failed("create", name, e.to_string()))?;
        tokio::fs::write(&path, unit)
            .await
            .map_err(|e| ServiceError::failed("create", name, e.to_string()))?;
        debug!(unit = %path.display(), "Unit file written");

        self.daemon_reload().await
    }

    async fn set_description(&self, name: &str, description: &str) -> Result<(), ServiceError> {
        let path = self.unit_path(name);
        let unit = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ServiceError::failed("describe", name, e.to_string()))?;
        let rewritten: String = unit
            .lines()
            .map(|line| {
                if line.starts_with("Description=") {
                    format!("Description={description}\n")
                } else {
                    format!("{line}\n")
                }
            })
            .collect();
        if rewritten == unit {
            return Ok(());
        }
        tokio::fs::write(&path, rewritten)
            .await
            .map_err(|e| ServiceError::failed("describe", name, e.to_string()))?;
        self.daemon_reload().await
    }

    async fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), ServiceError> {
        let verb = match startup {
            StartupType::Automatic => "enable",
            StartupType::Manual => "disable",
            StartupType::Disabled => "mask",
        };
        let out = self.systemctl([verb, name]).await?;
        if !out.success() {
            return Err(ServiceError::failed("configure", name, out.detail()));
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ServiceError> {
        if !self.unit_path(name).exists() {
            return Ok(());
        }
        let out = self.systemctl(["disable", "--now", name]).await?;
        if !out.success() {
            warn!(service = name, detail = %out.detail(), "disable --now failed");
        }
        self.delete_unit(name).await?;
        self.daemon_reload().await
    }

    async fn purge(&self, name: &str) -> Result<(), ServiceError> {
        self.delete_unit(name).await?;
        let _ = self.systemctl(["reset-failed", name]).await;
        self.daemon_reload().await
    }

    async fn configured_binary(&self, name: &str) -> Result<Option<PathBuf>, ServiceError> {
        let Ok(unit) = tokio::fs::read_to_string(self.unit_path(name)).await else {
            return Ok(None);
        };
        Ok(unit
            .lines()
            .find_map(|l| l.strip_prefix("ExecStart="))
            .and_then(|cmd| {
                let cmd = cmd.trim();
                let exe = match cmd.strip_prefix('"') {
                    Some(rest) => rest.split('"').next()?,
                    None => cmd.split_whitespace().next()?,
                };
                Some(PathBuf::from(exe))
            }))
    }

    fn log_paths(&self, _name: &str, install_path: &Path) -> Vec<PathBuf> {
        let logs = install_path.join("logs");
        vec![logs.join("stdout.log"), logs.join("stderr.log")]
    }
}
