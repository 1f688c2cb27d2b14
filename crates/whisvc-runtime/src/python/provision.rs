//! Interpreter provisioning with reuse and corruption recovery.
//!
//! `provision` is idempotent. An existing interpreter that passes both smoke
//! probes is reused without touching the network. Anything else at the target
//! path is torn down (after releasing whatever holds it open) and replaced
//! with a fresh download.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use whisvc_core::{
    ArchiveFetcher, CommandError, CommandRunner, CommandSpec, ElevatedToken, FetchError,
    InstallLayout, ProcessTable, ServiceManager,
};

use super::archive::{ArchiveError, extract_archive, patch_path_config};
use super::source::{GET_PIP_URL, RuntimeSource};
use crate::command::run_logged;
use crate::service::wait_until_stopped;
use crate::system::terminate_under;

const STOP_GRACE: Duration = Duration::from_secs(5);
const REMOVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("No runtime download is available for {os}/{arch}")]
    UnsupportedPlatform {
        os: &'static str,
        arch: &'static str,
    },

    #[error("Failed to remove existing runtime at {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create a download directory: {0}")]
    Staging(#[source] io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Runtime entry point missing after extraction: {0}")]
    EntryMissing(PathBuf),

    #[error("Package manager bootstrap failed: {0}")]
    PipBootstrap(String),

    #[error("Runtime failed validation after install: {0}")]
    Validation(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// A validated interpreter ready for package installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeHandle {
    root: PathBuf,
    python: PathBuf,
    reused: bool,
}

impl RuntimeHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// The existing interpreter passed validation and nothing was downloaded.
    pub const fn reused(&self) -> bool {
        self.reused
    }

    /// `python -m pip`, ready for more arguments.
    pub fn pip(&self) -> CommandSpec {
        CommandSpec::new(&self.python).args(["-m", "pip"])
    }

    #[cfg(test)]
    pub(crate) fn for_tests(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            python: InstallLayout::python_executable(&root),
            root,
            reused: true,
        }
    }
}

pub struct RuntimeProvisioner {
    runner: Arc<dyn CommandRunner>,
    fetcher: Arc<dyn ArchiveFetcher>,
    services: Arc<dyn ServiceManager>,
    processes: Arc<dyn ProcessTable>,
    service_name: String,
    source: Option<RuntimeSource>,
    stop_grace: Duration,
    _elevated: ElevatedToken,
}

impl RuntimeProvisioner {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn ArchiveFetcher>,
        services: Arc<dyn ServiceManager>,
        processes: Arc<dyn ProcessTable>,
        service_name: impl Into<String>,
        elevated: ElevatedToken,
    ) -> Self {
        Self {
            runner,
            fetcher,
            services,
            processes,
            service_name: service_name.into(),
            source: RuntimeSource::for_host(),
            stop_grace: STOP_GRACE,
            _elevated: elevated,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: RuntimeSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub async fn provision(&self, target: &Path) -> Result<RuntimeHandle, RuntimeError> {
        let python = InstallLayout::python_executable(target);

        if python.is_file() {
            match self.smoke_test(&python).await {
                Ok(()) => {
                    info!(runtime = %target.display(), "Existing runtime passed validation; reusing it");
                    return Ok(RuntimeHandle {
                        root: target.to_path_buf(),
                        python,
                        reused: true,
                    });
                }
                Err(reason) => {
                    warn!(runtime = %target.display(), %reason, "Existing runtime failed validation; reinstalling");
                }
            }
        }

        let source = self
            .source
            .clone()
            .ok_or(RuntimeError::UnsupportedPlatform {
                os: std::env::consts::OS,
                arch: std::env::consts::ARCH,
            })?;

        self.clear_target(target).await?;

        match self.install_fresh(target, &python, &source).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                // Leave nothing that could later pass for a usable runtime.
                if target.exists()
                    && let Err(rm) = std::fs::remove_dir_all(target)
                {
                    warn!(runtime = %target.display(), error = %rm, "Could not clean up partial runtime");
                }
                Err(e)
            }
        }
    }

    /// Both probes must exit zero: the interpreter runs, and pip is importable
    /// or executable.
    async fn smoke_test(&self, python: &Path) -> Result<(), String> {
        let version = run_logged(self.runner.as_ref(), &CommandSpec::new(python).arg("--version"))
            .await
            .map_err(|e| e.to_string())?;
        if !version.success() {
            return Err(format!("version probe failed: {}", version.detail()));
        }
        debug!(version = %version.stdout.trim(), "Interpreter responded");

        if self.pip_available(python).await {
            Ok(())
        } else {
            Err("package manager probe failed".to_string())
        }
    }

    async fn pip_available(&self, python: &Path) -> bool {
        let module = CommandSpec::new(python).args(["-m", "pip", "--version"]);
        if matches!(run_logged(self.runner.as_ref(), &module).await, Ok(out) if out.success()) {
            return true;
        }

        let Some(exe) = pip_executable(python).filter(|p| p.is_file()) else {
            return false;
        };
        let direct = CommandSpec::new(&exe).arg("--version");
        matches!(run_logged(self.runner.as_ref(), &direct).await, Ok(out) if out.success())
    }

    async fn clear_target(&self, target: &Path) -> Result<(), RuntimeError> {
        if !target.exists() {
            return Ok(());
        }

        self.release_service(target).await;
        terminate_under(self.processes.as_ref(), target, self.stop_grace).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match std::fs::remove_dir_all(target) {
                Ok(()) => {
                    info!(runtime = %target.display(), "Removed previous runtime");
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) if attempt < REMOVE_ATTEMPTS => {
                    debug!(attempt, error = %e, "Runtime removal failed; retrying");
                    sleep(Duration::from_millis(500) * attempt).await;
                }
                Err(source) => {
                    return Err(RuntimeError::Remove {
                        path: target.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Stop the service if its binary lives under `target`.
    async fn release_service(&self, target: &Path) {
        let name = self.service_name.as_str();
        let status = match self.services.status(name).await {
            Ok(status) => status,
            Err(e) => {
                warn!(service = name, error = %e, "Could not query service before runtime removal");
                return;
            }
        };
        if !status.is_active() {
            return;
        }

        let binary = self.services.configured_binary(name).await.ok().flatten();
        if !binary.as_deref().is_some_and(|b| b.starts_with(target)) {
            debug!(service = name, ?binary, "Running service does not use this runtime");
            return;
        }

        info!(service = name, "Stopping service to release runtime files");
        if let Err(e) = self.services.stop(name).await {
            warn!(service = name, error = %e, "Stop request failed");
        }
        if !wait_until_stopped(self.services.as_ref(), name, self.stop_grace).await {
            warn!(service = name, "Service still active after grace period");
        }
    }

    async fn install_fresh(
        &self,
        target: &Path,
        python: &Path,
        source: &RuntimeSource,
    ) -> Result<RuntimeHandle, RuntimeError> {
        let staging = tempfile::Builder::new()
            .prefix("whisvc-runtime-")
            .tempdir()
            .map_err(RuntimeError::Staging)?;
        let archive = staging.path().join(source.file_name());

        let bytes = self.fetcher.fetch(&source.url, &archive).await?;
        info!(url = %source.url, bytes, "Runtime archive downloaded");

        let files = extract_archive(&archive, source.kind, target, source.strip_prefix.as_deref())?;
        info!(runtime = %target.display(), files, "Runtime extracted");

        if let Some(path_config) = &source.path_config {
            patch_path_config(target, path_config)?;
        }
        if !python.is_file() {
            return Err(RuntimeError::EntryMissing(python.to_path_buf()));
        }

        self.ensure_pip(python, staging.path()).await?;
        self.smoke_test(python).await.map_err(RuntimeError::Validation)?;

        Ok(RuntimeHandle {
            root: target.to_path_buf(),
            python: python.to_path_buf(),
            reused: false,
        })
    }

    async fn ensure_pip(&self, python: &Path, staging: &Path) -> Result<(), RuntimeError> {
        if self.pip_available(python).await {
            debug!("Package manager already present");
            return Ok(());
        }

        let script = staging.join("get-pip.py");
        self.fetcher.fetch(GET_PIP_URL, &script).await?;
        let spec = CommandSpec::new(python)
            .arg(script.to_string_lossy())
            .arg("--no-warn-script-location");
        let output = run_logged(self.runner.as_ref(), &spec).await?;

        // get-pip can exit non-zero on harmless warnings; what matters is
        // whether pip works afterwards.
        if self.pip_available(python).await {
            info!("Package manager bootstrapped");
            Ok(())
        } else {
            Err(RuntimeError::PipBootstrap(output.detail()))
        }
    }
}

fn pip_executable(python: &Path) -> Option<PathBuf> {
    let dir = python.parent()?;
    if cfg!(windows) {
        Some(dir.join("Scripts").join("pip.exe"))
    } else {
        Some(dir.join("pip3"))
    }
}
