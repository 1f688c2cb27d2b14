//! The install flow.
//!
//! `Preflight → Configure → DetectCapability → ProvisionRuntime →
//! InstallDependencies → ProvisionService → Activate → Summarize`.
//! Each phase commits its observable state before the next begins.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info, warn};
use whisvc_core::settings::{SERVICE_DESCRIPTION, SERVICE_DISPLAY_NAME};
use whisvc_core::{
    AccelerationChoice, CommandSpec, ConfigScope, InstallLayout, InstallPhase, InstallationState,
    ModelTier, PortDisposition, ServicePort, ServiceRegistration, StartupType,
};

use super::context::InstallContext;
use super::error::{InstallError, InstallFailure};
use super::payload::stage_scripts;
use super::preflight::run_preflight;
use super::summary::InstallSummary;
use crate::health::wait_for_health;
use crate::lock::InstallLock;
use crate::python::{DependencyInstaller, RuntimeHandle, RuntimeProvisioner};
use crate::service::{ServiceProvisioner, StartOutcome};
use crate::system::{CapabilityDetector, PortResolver};

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub install_path: PathBuf,
    pub unattended: bool,
    /// Directory holding the service scripts to stage into the install root.
    pub payload_dir: Option<PathBuf>,
}

impl InstallRequest {
    pub fn new(install_path: impl Into<PathBuf>) -> Self {
        Self {
            install_path: install_path.into(),
            unattended: false,
            payload_dir: None,
        }
    }
}

/// Build the registration for an installed runtime.
///
/// Windows services run through the pywin32 host script; elsewhere the
/// service manager launches the server directly.
pub fn service_registration(
    layout: &InstallLayout,
    runtime: &RuntimeHandle,
    state: &InstallationState,
) -> ServiceRegistration {
    let entry = if cfg!(windows) {
        layout.service_script()
    } else {
        layout.server_script()
    };
    ServiceRegistration {
        name: state.service_name.clone(),
        display_name: SERVICE_DISPLAY_NAME.to_string(),
        description: SERVICE_DESCRIPTION.to_string(),
        binary_path: runtime.python().to_path_buf(),
        arguments: vec![entry.to_string_lossy().into_owned()],
        working_directory: layout.root().to_path_buf(),
        startup: StartupType::Automatic,
        environment: state.environment_entries(),
    }
}

pub struct Installer {
    ctx: InstallContext,
}

struct Tracker<'a> {
    ctx: &'a InstallContext,
    phase: InstallPhase,
    warnings: Vec<String>,
}

impl Tracker<'_> {
    fn enter(&mut self, phase: InstallPhase) {
        self.phase = phase;
        let index = InstallPhase::ALL
            .iter()
            .position(|p| *p == phase)
            .unwrap_or_default();
        info!(phase = %phase, "Entering phase");
        self.ctx
            .progress
            .phase(phase.as_str(), index, InstallPhase::ALL.len());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(phase = %self.phase, "{msg}");
        self.ctx.progress.message(&format!("WARNING: {msg}"));
        self.warnings.push(msg);
    }
}

impl Installer {
    pub const fn new(ctx: InstallContext) -> Self {
        Self { ctx }
    }

    pub const fn context(&self) -> &InstallContext {
        &self.ctx
    }

    pub async fn run(&self, request: InstallRequest) -> Result<InstallSummary, InstallFailure> {
        let mut tracker = Tracker {
            ctx: &self.ctx,
            phase: InstallPhase::Preflight,
            warnings: Vec::new(),
        };
        info!(install_path = %request.install_path.display(), "Install started");

        match self.execute(&request, &mut tracker).await {
            Ok(summary) => {
                self.ctx.progress.finish("Installation complete");
                info!(warnings = summary.warnings.len(), "Install finished");
                Ok(summary)
            }
            Err(err) => {
                error!(phase = %tracker.phase, error = %err, "Install failed");
                self.ctx
                    .progress
                    .finish_with_error(&format!("{} failed: {err}", tracker.phase));
                Err(InstallFailure {
                    phase: tracker.phase.as_str(),
                    error: err,
                    logs: self.ctx.log.locations(),
                })
            }
        }
    }

    async fn execute(
        &self,
        request: &InstallRequest,
        t: &mut Tracker<'_>,
    ) -> Result<InstallSummary, InstallError> {
        let ctx = &self.ctx;
        let a = &ctx.adapters;
        let name = ctx.service_name.as_str();

        // =====================================================================
        // Preflight
        // =====================================================================
        t.enter(InstallPhase::Preflight);
        if request.unattended {
            return Err(InstallError::UnattendedUnsupported);
        }
        let preflight = run_preflight(a.host.as_ref()).await?;
        let token = preflight.token;
        for w in preflight.warnings {
            t.warn(w);
        }
        let layout = InstallLayout::new(&request.install_path)?;
        let _lock = InstallLock::acquire_with(&layout, a.processes.as_ref())?;

        // =====================================================================
        // Configure
        // =====================================================================
        t.enter(InstallPhase::Configure);
        let previous = InstallationState::load(a.config.as_ref(), name).await?;
        if let Some(prev) = &previous {
            info!(model = %prev.model, port = %prev.port, "Found previous install");
        }
        let model = a
            .prompt
            .choose_model(previous.as_ref().map_or(ModelTier::default(), |p| p.model))?;
        let port = a
            .prompt
            .choose_port(previous.as_ref().map_or(ServicePort::default(), |p| p.port))?;
        let resolution = PortResolver::new(a.config.clone(), a.services.clone())
            .resolve(port, name)
            .await;
        if let Some(w) = &resolution.warning {
            t.warn(format!("Port {}: {w}", port.get()));
        }

        // =====================================================================
        // DetectCapability
        // =====================================================================
        t.enter(InstallPhase::DetectCapability);
        let mut detector = CapabilityDetector::new(a.runner.clone());
        if let Some(candidates) = &ctx.gpu_tool_candidates {
            detector = detector.with_candidates(candidates.clone());
        }
        let capability = detector.detect().await;
        let confirmed = if capability.compatible() {
            let device = capability.device_name().unwrap_or("the detected GPU");
            a.prompt
                .confirm(&format!("Enable CUDA acceleration on {device}?"), true)?
        } else {
            t.warn(format!(
                "GPU acceleration unavailable: {}. Installing in CPU mode.",
                capability.reason()
            ));
            false
        };
        let acceleration = AccelerationChoice::from_report(&capability, confirmed);
        info!(acceleration = acceleration.label(), "Acceleration decided");

        std::fs::create_dir_all(layout.logs_dir())
            .map_err(|e| InstallError::fs("create", layout.logs_dir(), e))?;
        if !ctx.log.attach_secondary(&layout.logs_dir()) {
            t.warn("Could not open the log file inside the install directory; logging to the temp directory only.");
        }

        let state = InstallationState {
            service_name: name.to_string(),
            install_path: layout.root().to_path_buf(),
            runtime_path: layout.runtime_dir(),
            model,
            port,
            acceleration,
            installed_at: Some(Utc::now()),
        };
        state.persist(a.config.as_ref()).await?;
        info!(
            location = %a.config.describe(name, ConfigScope::Installation),
            "Installation state saved"
        );

        // =====================================================================
        // ProvisionRuntime
        // =====================================================================
        t.enter(InstallPhase::ProvisionRuntime);
        let mut provisioner = RuntimeProvisioner::new(
            a.runner.clone(),
            a.fetcher.clone(),
            a.services.clone(),
            a.processes.clone(),
            name,
            token,
        )
        .with_stop_grace(ctx.stop_grace);
        if let Some(source) = &ctx.runtime_source {
            provisioner = provisioner.with_source(source.clone());
        }
        let runtime = provisioner.provision(&layout.runtime_dir()).await?;

        // =====================================================================
        // InstallDependencies
        // =====================================================================
        t.enter(InstallPhase::InstallDependencies);
        let deps = DependencyInstaller::new(a.runner.clone())
            .install(&runtime, acceleration)
            .await?;
        if let Some(reason) = &deps.upgrade_warning {
            t.warn(format!("pip could not upgrade itself: {reason}"));
        }

        // =====================================================================
        // ProvisionService
        // =====================================================================
        t.enter(InstallPhase::ProvisionService);
        if let Some(payload) = &request.payload_dir {
            stage_scripts(payload, &layout)?;
        }
        let registration = service_registration(&layout, &runtime, &state);
        if let Some(entry) = registration.arguments.first().map(PathBuf::from)
            && !entry.is_file()
        {
            t.warn(format!(
                "Service script {} is missing; the service cannot start until it is installed.",
                entry.display()
            ));
        }
        let services = ServiceProvisioner::new(
            a.services.clone(),
            a.config.clone(),
            a.runner.clone(),
            token,
        )
        .with_stop_grace(ctx.stop_grace)
        .with_removal_command(removal_command(&layout, runtime.python()));
        let handle = services.provision(&registration).await?;

        // =====================================================================
        // Activate
        // =====================================================================
        t.enter(InstallPhase::Activate);
        let start = services.start(&handle).await;
        match &start {
            StartOutcome::Started if resolution.disposition == PortDisposition::OwnedByOther => {
                t.warn(format!(
                    "Health check skipped: port {} was already held by another process.",
                    port.get()
                ));
            }
            StartOutcome::Started => {
                if let Err(reason) = wait_for_health(port.get(), ctx.health_timeout).await {
                    t.warn(format!("Service started but is not answering yet: {reason}"));
                }
            }
            StartOutcome::Failed(reason) => t.warn(format!(
                "Service did not start ({reason}). It is set to start automatically on next boot."
            )),
        }

        // =====================================================================
        // Summarize
        // =====================================================================
        t.enter(InstallPhase::Summarize);
        let logs = ctx.log.locations();
        if logs.secondary_failures > 0 {
            t.warn(format!(
                "{} log records could not be written to the install directory log.",
                logs.secondary_failures
            ));
        }

        Ok(InstallSummary {
            service_name: name.to_string(),
            install_path: layout.root().to_path_buf(),
            runtime_path: runtime.root().to_path_buf(),
            model,
            port: port.get(),
            port_disposition: resolution.disposition,
            capability,
            acceleration,
            torch: deps.variant,
            runtime_reused: runtime.reused(),
            start,
            warnings: std::mem::take(&mut t.warnings),
            logs,
            service_logs: a.services.log_paths(name, layout.root()),
            config_locations: vec![
                a.config.describe(name, ConfigScope::Environment),
                a.config.describe(name, ConfigScope::Installation),
            ],
        })
    }
}

/// `python whisper_service.py remove`, where the host script and
/// interpreter both exist.
pub(super) fn removal_command(layout: &InstallLayout, python: &Path) -> Option<CommandSpec> {
    let script = layout.service_script();
    (cfg!(windows) && script.is_file() && python.is_file()).then(|| {
        CommandSpec::new(python)
            .arg(script.to_string_lossy())
            .arg("remove")
            .current_dir(layout.root())
    })
}
