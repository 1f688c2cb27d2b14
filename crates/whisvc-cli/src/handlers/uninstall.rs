//! Uninstall command handler.

use std::path::PathBuf;
use std::sync::Arc;

use whisvc_core::{ConfigStore, InstallationState, default_install_path};
use whisvc_runtime::{InstallLog, UninstallRequest, Uninstaller};

use crate::bootstrap::{CliConfig, Platform, flow_context};
use crate::error::CliError;
use crate::presentation::{render_failure, render_uninstall_summary};
use crate::prompt::ConsolePrompt;

#[derive(Debug, Clone, Default)]
pub struct UninstallArgs {
    pub install_path: Option<PathBuf>,
    pub keep_install_dir: bool,
}

/// Explicit path first, then the recorded install, then the platform default.
pub async fn resolve_install_path(
    explicit: Option<PathBuf>,
    config: &dyn ConfigStore,
    service_name: &str,
) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let recorded = InstallationState::load(config, service_name)
        .await?
        .map(|state| state.install_path);
    Ok(recorded.unwrap_or_else(default_install_path))
}

pub async fn execute(
    platform: &Platform,
    log: InstallLog,
    config: CliConfig,
    args: UninstallArgs,
) -> Result<(), CliError> {
    let adapters = platform.adapters(Arc::new(ConsolePrompt::stdio()));
    let ctx = flow_context(adapters, log, config);
    let install_path =
        resolve_install_path(args.install_path, platform.config.as_ref(), &ctx.service_name).await?;
    tracing::info!(install_path = %install_path.display(), "Starting uninstall");

    let request = UninstallRequest {
        install_path,
        keep_install_dir: args.keep_install_dir,
    };
    match Uninstaller::new(ctx).run(request).await {
        Ok(summary) => {
            println!();
            print!("{}", render_uninstall_summary(&summary));
            Ok(())
        }
        Err(failure) => {
            eprint!("{}", render_failure(&failure));
            Err(failure.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whisvc_core::testing::MemoryConfigStore;
    use whisvc_core::{AccelerationChoice, ModelTier, ServicePort};

    #[tokio::test]
    async fn recorded_install_path_is_used_when_not_given() {
        let store = MemoryConfigStore::default();
        InstallationState {
            service_name: "whisper-api".to_string(),
            install_path: PathBuf::from("/srv/custom-whisper"),
            runtime_path: PathBuf::from("/srv/custom-whisper/python"),
            model: ModelTier::Small,
            port: ServicePort::default(),
            acceleration: AccelerationChoice::cpu(),
            installed_at: None,
        }
        .persist(&store)
        .await
        .unwrap();

        let resolved = resolve_install_path(None, &store, "whisper-api").await.unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/custom-whisper"));

        let explicit = resolve_install_path(Some(PathBuf::from("/elsewhere")), &store, "whisper-api")
            .await
            .unwrap();
        assert_eq!(explicit, PathBuf::from("/elsewhere"));
    }

    #[tokio::test]
    async fn missing_record_falls_back_to_default() {
        let store = MemoryConfigStore::default();
        let resolved = resolve_install_path(None, &store, "whisper-api").await.unwrap();
        assert_eq!(resolved, default_install_path());
    }
}
