//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where concrete adapters are chosen for the
//! host platform:
//! - Windows: `sc.exe` service manager and registry config store
//! - elsewhere: systemd service manager and env-file config store
//!
//! Handlers receive the composed [`Adapters`] and never construct adapters
//! themselves.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use whisvc_core::{
    CommandRunner, ConfigStore, HostProbe, OperatorPrompt, Privilege, ServiceManager,
};
use whisvc_runtime::{
    Adapters, HttpArchiveFetcher, InstallContext, InstallLog, ProcessCommandRunner, ProgressHandle,
    SysinfoProcessTable, SystemHostProbe, TerminalProgress,
};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliConfig {
    pub verbose: bool,
    /// Render the phase spinner on stderr.
    pub progress: bool,
    /// Override for the post-start health wait; `None` keeps the default.
    pub health_timeout: Option<Duration>,
}

impl CliConfig {
    /// Spinner only on an interactive terminal, and never mixed with debug output.
    pub fn for_terminal(verbose: bool) -> Self {
        Self {
            verbose,
            progress: !verbose && console::Term::stderr().is_term(),
            health_timeout: None,
        }
    }
}

/// Platform service manager and config store, sharing one runner.
pub struct Platform {
    pub runner: Arc<dyn CommandRunner>,
    pub host: Arc<dyn HostProbe>,
    pub privilege: Privilege,
    pub config: Arc<dyn ConfigStore>,
    pub services: Arc<dyn ServiceManager>,
    /// Where the configuration lives, for display.
    pub config_location: PathBuf,
}

impl Platform {
    /// Probe privilege and choose the adapters for this OS.
    pub async fn detect() -> Result<Self, CliError> {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessCommandRunner);
        let host: Arc<dyn HostProbe> = Arc::new(SystemHostProbe::new(Arc::clone(&runner)));
        let privilege = host.privilege().await;
        debug!(%privilege, "Resolved privilege");
        Self::compose(runner, host, privilege)
    }

    #[cfg(windows)]
    fn compose(
        runner: Arc<dyn CommandRunner>,
        host: Arc<dyn HostProbe>,
        privilege: Privilege,
    ) -> Result<Self, CliError> {
        use whisvc_runtime::{RegistryConfigStore, ScServiceManager};

        Ok(Self {
            config: Arc::new(RegistryConfigStore::new(Arc::clone(&runner))),
            services: Arc::new(ScServiceManager::new(Arc::clone(&runner))),
            config_location: PathBuf::from(r"HKLM\SYSTEM\CurrentControlSet\Services"),
            runner,
            host,
            privilege,
        })
    }

    #[cfg(not(windows))]
    fn compose(
        runner: Arc<dyn CommandRunner>,
        host: Arc<dyn HostProbe>,
        privilege: Privilege,
    ) -> Result<Self, CliError> {
        use whisvc_runtime::{EnvFileConfigStore, SystemdServiceManager};

        let root = whisvc_core::config_root(privilege == Privilege::Elevated)?;
        Ok(Self {
            config: Arc::new(EnvFileConfigStore::new(root.clone())),
            services: Arc::new(SystemdServiceManager::new(Arc::clone(&runner), root.clone())),
            config_location: root,
            runner,
            host,
            privilege,
        })
    }

    /// Full adapter set for a mutating flow.
    pub fn adapters(&self, prompt: Arc<dyn OperatorPrompt>) -> Adapters {
        Adapters {
            runner: Arc::clone(&self.runner),
            config: Arc::clone(&self.config),
            services: Arc::clone(&self.services),
            processes: Arc::new(SysinfoProcessTable),
            host: Arc::clone(&self.host),
            fetcher: Arc::new(HttpArchiveFetcher::new()),
            prompt,
        }
    }
}

/// Build the flow context for one install or uninstall run.
pub fn flow_context(adapters: Adapters, log: InstallLog, config: CliConfig) -> InstallContext {
    let mut ctx = InstallContext::new(adapters, log);
    if config.progress {
        ctx = ctx.with_progress(ProgressHandle::new(Arc::new(TerminalProgress::spawn())));
    }
    if let Some(timeout) = config.health_timeout {
        ctx = ctx.with_health_timeout(timeout);
    }
    ctx
}
