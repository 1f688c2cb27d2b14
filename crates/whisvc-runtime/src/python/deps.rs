//! Package installation into the provisioned interpreter.
//!
//! Three steps, always in this order: a pip self-upgrade (advisory), the
//! support packages in one batch, then the torch pair from whichever index
//! matches the acceleration choice.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use whisvc_core::{AccelerationChoice, CommandError, CommandRunner, CommandSpec};

use super::provision::RuntimeHandle;
use crate::command::run_logged;

/// Wheel index carrying the CUDA 12.8 builds of torch.
pub const CUDA_INDEX_URL: &str = "https://download.pytorch.org/whl/cu128";

const TORCH_PACKAGES: [&str; 2] = ["torch", "torchaudio"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TorchVariant {
    Cuda,
    Cpu,
}

impl TorchVariant {
    pub const fn for_choice(choice: AccelerationChoice) -> Self {
        if choice.enabled() { Self::Cuda } else { Self::Cpu }
    }

    /// Extra index arguments for `pip install`.
    fn index_args(self) -> &'static [&'static str] {
        match self {
            Self::Cuda => &["--index-url", CUDA_INDEX_URL],
            Self::Cpu => &[],
        }
    }
}

impl fmt::Display for TorchVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda => f.write_str("CUDA"),
            Self::Cpu => f.write_str("CPU"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("Failed to install service packages: {detail}")]
    SupportPackages { code: Option<i32>, detail: String },

    #[error("Failed to install the {variant} build of torch: {detail}")]
    Torch {
        variant: TorchVariant,
        code: Option<i32>,
        detail: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub variant: TorchVariant,
    /// Set when the pip self-upgrade failed; installation carried on.
    pub upgrade_warning: Option<String>,
}

/// Packages the service imports at startup.
pub fn support_packages() -> Vec<&'static str> {
    let mut packages = vec![
        "fastapi",
        "uvicorn",
        "python-multipart",
        "faster-whisper",
        "numpy",
        "soundfile",
    ];
    if cfg!(windows) {
        packages.push("pywin32");
    }
    packages
}

pub struct DependencyInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl DependencyInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn install(
        &self,
        runtime: &RuntimeHandle,
        acceleration: AccelerationChoice,
    ) -> Result<DependencyReport, DependencyError> {
        // =====================================================================
        // pip self-upgrade
        // =====================================================================
        let upgrade = runtime
            .pip()
            .args(["install", "--upgrade", "pip", "--no-warn-script-location"]);
        let upgrade_warning = match run_logged(self.runner.as_ref(), &upgrade).await {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.detail()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = &upgrade_warning {
            warn!(%reason, "pip self-upgrade failed; continuing with the bundled version");
        }

        // =====================================================================
        // Service packages
        // =====================================================================
        let packages = support_packages();
        info!(?packages, "Installing service packages");
        let batch = install_command(runtime).args(packages.iter().copied());
        let out = run_logged(self.runner.as_ref(), &batch).await?;
        if !out.success() {
            return Err(DependencyError::SupportPackages {
                code: out.code,
                detail: out.detail(),
            });
        }

        // =====================================================================
        // torch
        // =====================================================================
        let variant = TorchVariant::for_choice(acceleration);
        info!(%variant, "Installing torch");
        let torch = install_command(runtime)
            .args(TORCH_PACKAGES)
            .args(variant.index_args().iter().copied());
        let out = run_logged(self.runner.as_ref(), &torch).await?;
        if !out.success() {
            return Err(DependencyError::Torch {
                variant,
                code: out.code,
                detail: out.detail(),
            });
        }

        Ok(DependencyReport {
            variant,
            upgrade_warning,
        })
    }
}

fn install_command(runtime: &RuntimeHandle) -> CommandSpec {
    runtime
        .pip()
        .args(["install", "--no-warn-script-location"])
}
