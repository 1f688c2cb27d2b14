//! The uninstall flow.
//!
//! `StopService → RemoveRegistration → TerminateStrayProcesses →
//! RemoveEnvironment → RemoveFiles → Summarize`. Every phase tolerates
//! finding nothing to do, so a second run on a clean machine is a no-op.
//! Only generated artifacts are deleted: the runtime, logs and caches. The
//! service scripts belong to whoever shipped them.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use whisvc_core::{ConfigScope, InstallLayout, UninstallPhase};

use super::context::InstallContext;
use super::error::{InstallError, InstallFailure};
use super::installer::removal_command;
use super::summary::UninstallSummary;
use crate::lock::InstallLock;
use crate::service::ServiceProvisioner;
use crate::system::terminate_under;

const PHASES: usize = 6;

#[derive(Debug, Clone)]
pub struct UninstallRequest {
    pub install_path: PathBuf,
    /// Leave the runtime, logs and installation record in place.
    pub keep_install_dir: bool,
}

pub struct Uninstaller {
    ctx: InstallContext,
}

impl Uninstaller {
    pub const fn new(ctx: InstallContext) -> Self {
        Self { ctx }
    }

    pub const fn context(&self) -> &InstallContext {
        &self.ctx
    }

    pub async fn run(&self, request: UninstallRequest) -> Result<UninstallSummary, InstallFailure> {
        let mut phase = UninstallPhase::StopService;
        info!(install_path = %request.install_path.display(), "Uninstall started");

        match self.execute(&request, &mut phase).await {
            Ok(summary) => {
                self.ctx.progress.finish("Uninstall complete");
                info!(noop = summary.was_noop(), "Uninstall finished");
                Ok(summary)
            }
            Err(err) => {
                error!(phase = %phase, error = %err, "Uninstall failed");
                self.ctx
                    .progress
                    .finish_with_error(&format!("{phase} failed: {err}"));
                Err(InstallFailure {
                    phase: phase.as_str(),
                    error: err,
                    logs: self.ctx.log.locations(),
                })
            }
        }
    }

    fn enter(&self, current: &mut UninstallPhase, next: UninstallPhase, index: usize) {
        *current = next;
        info!(phase = %next, "Entering phase");
        self.ctx.progress.phase(next.as_str(), index, PHASES);
    }

    async fn execute(
        &self,
        request: &UninstallRequest,
        phase: &mut UninstallPhase,
    ) -> Result<UninstallSummary, InstallError> {
        let ctx = &self.ctx;
        let a = &ctx.adapters;
        let name = ctx.service_name.as_str();
        let mut warnings = Vec::new();

        // =====================================================================
        // StopService
        // =====================================================================
        self.enter(phase, UninstallPhase::StopService, 0);
        let token = a
            .host
            .privilege()
            .await
            .require()
            .ok_or(InstallError::NotElevated)?;
        let layout = InstallLayout::new(&request.install_path)?;
        let _lock = InstallLock::acquire_with(&layout, a.processes.as_ref())?;
        // Mirrored until RemoveFiles deletes the directory.
        if layout.logs_dir().is_dir() {
            ctx.log.attach_secondary(&layout.logs_dir());
        }

        let services = ServiceProvisioner::new(
            a.services.clone(),
            a.config.clone(),
            a.runner.clone(),
            token,
        )
        .with_stop_grace(ctx.stop_grace)
        .with_removal_command(removal_command(
            &layout,
            &InstallLayout::python_executable(&layout.runtime_dir()),
        ));
        let was_running = services.stop(name).await?;

        // =====================================================================
        // RemoveRegistration
        // =====================================================================
        self.enter(phase, UninstallPhase::RemoveRegistration, 1);
        let teardown = services.teardown(name).await?;
        if teardown.purged {
            warnings.push(format!(
                "Service '{name}' had to be deleted from the service database directly."
            ));
        }

        // =====================================================================
        // TerminateStrayProcesses
        // =====================================================================
        self.enter(phase, UninstallPhase::TerminateStrayProcesses, 2);
        let terminated = terminate_under(a.processes.as_ref(), layout.root(), ctx.stop_grace).await;
        if !terminated.is_empty() {
            info!(?terminated, "Stray processes terminated");
        }

        // =====================================================================
        // RemoveEnvironment
        // =====================================================================
        self.enter(phase, UninstallPhase::RemoveEnvironment, 3);
        a.config.clear(name, ConfigScope::Environment).await?;
        if request.keep_install_dir {
            info!("Keeping installation record for a later reinstall");
        } else {
            a.config.clear(name, ConfigScope::Installation).await?;
        }

        // =====================================================================
        // RemoveFiles
        // =====================================================================
        self.enter(phase, UninstallPhase::RemoveFiles, 4);
        let mut removed = Vec::new();
        if request.keep_install_dir {
            info!(install_path = %layout.root().display(), "Keeping install directory");
        } else {
            ctx.log.detach_secondary();
            let mut targets = vec![layout.runtime_dir(), layout.logs_dir()];
            targets.extend(layout.cache_dirs());
            for dir in targets {
                if remove_tree(&dir)? {
                    removed.push(dir);
                }
            }
            // Succeeds only if nothing else (e.g. packaged scripts) is left.
            if std::fs::remove_dir(layout.root()).is_ok() {
                debug!(install_path = %layout.root().display(), "Removed empty install directory");
            }
        }

        // =====================================================================
        // Summarize
        // =====================================================================
        self.enter(phase, UninstallPhase::Summarize, 5);
        let logs = ctx.log.locations();
        if logs.secondary_failures > 0 {
            let msg = format!(
                "{} log records could not be written to the install directory log.",
                logs.secondary_failures
            );
            warn!("{msg}");
            warnings.push(msg);
        }

        Ok(UninstallSummary {
            service_name: name.to_string(),
            install_path: layout.root().to_path_buf(),
            was_registered: teardown.was_present,
            was_running: was_running || teardown.was_running,
            purged: teardown.purged,
            terminated,
            removed,
            kept_install_dir: request.keep_install_dir,
            warnings,
            logs,
        })
    }
}

/// Returns whether anything was there to remove.
fn remove_tree(dir: &Path) -> Result<bool, InstallError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            info!(path = %dir.display(), "Removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(InstallError::fs("remove", dir, e)),
    }
}
