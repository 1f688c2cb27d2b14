//! Status command handler. Read-only.

use tracing::warn;
use whisvc_core::{ConfigStore, InstallationState, ServiceManager, ServiceStatus};
use whisvc_runtime::CapabilityDetector;

use crate::bootstrap::Platform;
use crate::error::CliError;
use crate::presentation::{StatusView, render_status};

/// Gather service state, the installation record, and a fresh capability report.
///
/// A service manager that cannot be queried is reported, not fatal.
pub async fn collect(
    services: &dyn ServiceManager,
    config: &dyn ConfigStore,
    detector: &CapabilityDetector,
    service_name: &str,
    config_location: String,
) -> Result<StatusView, CliError> {
    let service = match services.status(service_name).await {
        Ok(status) => status,
        Err(e) => {
            warn!(service = %service_name, error = %e, "Service status unavailable");
            ServiceStatus::Unknown(e.to_string())
        }
    };
    let installation = InstallationState::load(config, service_name).await?;
    let capability = detector.detect().await;

    Ok(StatusView {
        service_name: service_name.to_string(),
        service,
        installation,
        capability,
        config_location,
    })
}

pub async fn execute(platform: &Platform, service_name: &str, json: bool) -> Result<(), CliError> {
    let detector = CapabilityDetector::new(platform.runner.clone());
    let view = collect(
        platform.services.as_ref(),
        platform.config.as_ref(),
        &detector,
        service_name,
        platform.config_location.display().to_string(),
    )
    .await?;

    if json {
        let text = serde_json::to_string_pretty(&view).map_err(anyhow::Error::from)?;
        println!("{text}");
    } else {
        print!("{}", render_status(&view));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use whisvc_core::testing::{MemoryConfigStore, MemoryServiceManager, ScriptedRunner};
    use whisvc_core::{
        AccelerationChoice, ModelTier, ServicePort, ServiceRegistration, StartupType,
    };

    fn registration() -> ServiceRegistration {
        ServiceRegistration {
            name: "whisper-api".to_string(),
            display_name: "Whisper API Server".to_string(),
            description: String::new(),
            binary_path: PathBuf::from("/opt/whisper-api/python/bin/python3"),
            arguments: vec!["/opt/whisper-api/server.py".to_string()],
            working_directory: PathBuf::from("/opt/whisper-api"),
            startup: StartupType::Automatic,
            environment: Vec::new(),
        }
    }

    fn detector() -> CapabilityDetector {
        CapabilityDetector::new(Arc::new(ScriptedRunner::default())).with_candidates(Vec::new())
    }

    #[tokio::test]
    async fn reports_running_service_and_record() {
        let services =
            MemoryServiceManager::default().with_service(registration(), ServiceStatus::Running);
        let config = MemoryConfigStore::default();
        InstallationState {
            service_name: "whisper-api".to_string(),
            install_path: PathBuf::from("/opt/whisper-api"),
            runtime_path: PathBuf::from("/opt/whisper-api/python"),
            model: ModelTier::LargeV3,
            port: ServicePort::new(9000).unwrap(),
            acceleration: AccelerationChoice::cpu(),
            installed_at: None,
        }
        .persist(&config)
        .await
        .unwrap();

        let view = collect(&services, &config, &detector(), "whisper-api", "/etc/whisvc".into())
            .await
            .unwrap();

        assert_eq!(view.service, ServiceStatus::Running);
        assert_eq!(view.installation.unwrap().model, ModelTier::LargeV3);
        assert!(!view.capability.device_found());
        assert!(services.ops().is_empty());
    }

    #[tokio::test]
    async fn nothing_installed_is_not_an_error() {
        let view = collect(
            &MemoryServiceManager::default(),
            &MemoryConfigStore::default(),
            &detector(),
            "whisper-api",
            "/etc/whisvc".into(),
        )
        .await
        .unwrap();

        assert_eq!(view.service, ServiceStatus::NotInstalled);
        assert!(view.installation.is_none());
    }
}
