//! Explicit dependencies of a flow run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use whisvc_core::settings::SERVICE_NAME;
use whisvc_core::{
    ArchiveFetcher, CommandRunner, ConfigStore, HostProbe, OperatorPrompt, ProcessTable,
    ServiceManager,
};

use crate::health::DEFAULT_HEALTH_TIMEOUT;
use crate::logging::InstallLog;
use crate::progress::ProgressHandle;
use crate::python::RuntimeSource;

const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// The OS-facing ports a flow talks through.
#[derive(Clone)]
pub struct Adapters {
    pub runner: Arc<dyn CommandRunner>,
    pub config: Arc<dyn ConfigStore>,
    pub services: Arc<dyn ServiceManager>,
    pub processes: Arc<dyn ProcessTable>,
    pub host: Arc<dyn HostProbe>,
    pub fetcher: Arc<dyn ArchiveFetcher>,
    pub prompt: Arc<dyn OperatorPrompt>,
}

/// Everything a flow needs, passed in rather than reached for.
pub struct InstallContext {
    pub adapters: Adapters,
    pub log: InstallLog,
    pub progress: ProgressHandle,
    pub service_name: String,
    /// Zero disables the post-start health wait.
    pub health_timeout: Duration,
    pub stop_grace: Duration,
    /// Overrides the platform's runtime archive.
    pub runtime_source: Option<RuntimeSource>,
    /// Restricts where the capability query tool is looked for.
    pub gpu_tool_candidates: Option<Vec<PathBuf>>,
}

impl InstallContext {
    pub fn new(adapters: Adapters, log: InstallLog) -> Self {
        Self {
            adapters,
            log,
            progress: ProgressHandle::none(),
            service_name: SERVICE_NAME.to_string(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
            runtime_source: None,
            gpu_tool_candidates: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    #[must_use]
    pub fn with_runtime_source(mut self, source: RuntimeSource) -> Self {
        self.runtime_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_gpu_tool_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.gpu_tool_candidates = Some(candidates);
        self
    }
}
