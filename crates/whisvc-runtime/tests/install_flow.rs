//! End-to-end install flow against faked host ports.

mod common;

use std::time::Duration;

use common::{Harness, existing_service};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};
use whisvc_core::testing::{MemoryServiceManager, ScriptedPrompt, ServiceOp, StaticHostProbe};
use whisvc_core::{
    CommandError, CommandOutput, CommandSpec, ConfigScope, ConfigStore, PortDisposition,
    ServicePort, ServiceStatus, StartupType,
};
use whisvc_runtime::python::{CUDA_INDEX_URL, TorchVariant};
use whisvc_runtime::{InstallError, InstallRequest, Installer, StartOutcome};

fn op(f: fn(String) -> ServiceOp) -> ServiceOp {
    f("whisper-api".to_string())
}

fn fresh_install_ops() -> Vec<ServiceOp> {
    vec![
        op(ServiceOp::Create),
        op(ServiceOp::SetDescription),
        ServiceOp::SetStartup("whisper-api".to_string(), StartupType::Automatic),
        op(ServiceOp::Start),
    ]
}

#[tokio::test]
async fn install_without_gpu_persists_cpu_configuration() {
    let h = Harness::builder().build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(!summary.acceleration.enabled());
    assert_eq!(summary.torch, TorchVariant::Cpu);
    assert_eq!(summary.start, StartOutcome::Started);
    assert!(!summary.runtime_reused);
    assert!(summary.warnings.iter().any(|w| w.contains("CPU mode")));

    let env = h.config.snapshot("whisper-api", ConfigScope::Environment);
    assert_eq!(env.len(), 4);
    assert_eq!(env["WHISPER_HOST"], "127.0.0.1");
    assert_eq!(env["WHISPER_PORT"], "4444");
    assert_eq!(env["WHISPER_MODEL"], "small");
    assert_eq!(env["CUDA_DEVICE_ID"], "0");

    let record = h.config.snapshot("whisper-api", ConfigScope::Installation);
    assert_eq!(record["acceleration"], "cpu");
    assert!(record.contains_key("installed_at"));

    assert_eq!(h.services.ops(), fresh_install_ops());
    let registration = h.services.registration("whisper-api").unwrap();
    assert_eq!(registration.binary_path, h.python());
    assert_eq!(registration.working_directory, h.install_path);

    assert_eq!(h.fetcher.request_count(), 1);
    let torch = h.runner.calls_matching("torchaudio");
    assert_eq!(torch.len(), 1);
    assert!(!torch[0].contains("--index-url"));

    assert!(summary.logs.primary.is_file());
    assert_eq!(
        summary.logs.secondary.as_deref(),
        Some(h.layout().logs_dir().join("install.log").as_path())
    );
    assert_eq!(summary.service_logs[0], h.layout().stdout_log());
}

#[tokio::test]
async fn compatible_gpu_with_consent_enables_cuda() {
    let h = Harness::builder()
        .gpu("NVIDIA GeForce RTX 3060, 560.94, 8.6")
        .prompt(ScriptedPrompt::new(None, None, true))
        .build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(summary.acceleration.enabled());
    assert_eq!(summary.torch, TorchVariant::Cuda);
    assert_eq!(h.prompt.questions().len(), 1);
    assert!(h.runner.calls_matching("torchaudio")[0].contains(CUDA_INDEX_URL));
    assert_eq!(
        h.config.snapshot("whisper-api", ConfigScope::Installation)["acceleration"],
        "cuda"
    );
}

#[tokio::test]
async fn declined_acceleration_installs_cpu_build() {
    let h = Harness::builder()
        .gpu("NVIDIA GeForce RTX 4090, 560.94, 8.9")
        .prompt(ScriptedPrompt::new(None, None, false))
        .build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(summary.capability.compatible());
    assert!(!summary.acceleration.enabled());
    assert_eq!(summary.torch, TorchVariant::Cpu);
}

#[tokio::test]
async fn old_gpu_is_never_offered_acceleration() {
    let h = Harness::builder()
        .gpu("NVIDIA GeForce GTX 1080, 535.104, 6.1")
        .prompt(ScriptedPrompt::new(None, None, true))
        .build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(summary.capability.device_found());
    assert!(!summary.capability.compatible());
    assert!(!summary.acceleration.enabled());
    assert!(h.prompt.questions().is_empty());
}

#[tokio::test]
async fn missing_privilege_fails_before_touching_anything() {
    let h = Harness::builder().host(StaticHostProbe::standard()).build();

    let failure = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "Preflight");
    assert!(matches!(failure.error, InstallError::NotElevated));
    assert!(failure.primary_log().is_file());
    assert!(failure.secondary_log().is_none());

    assert!(h.runner.calls().is_empty());
    assert!(h.services.ops().is_empty());
    assert!(h.config.is_empty_for("whisper-api"));
    assert_eq!(h.fetcher.request_count(), 0);
    assert!(!h.install_path.exists());
}

#[tokio::test]
async fn unattended_mode_is_rejected() {
    let h = Harness::builder().build();
    let mut request = InstallRequest::new(&h.install_path);
    request.unattended = true;

    let failure = Installer::new(h.context("install"))
        .run(request)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "Preflight");
    assert!(matches!(failure.error, InstallError::UnattendedUnsupported));
}

#[tokio::test]
async fn soft_preflight_failures_become_warnings() {
    let host = StaticHostProbe {
        connectivity: false,
        media_tool: None,
        ..StaticHostProbe::elevated()
    };
    let h = Harness::builder().host(host).build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(summary.warnings.iter().any(|w| w.contains("package index")));
    assert!(summary.warnings.iter().any(|w| w.contains("ffmpeg")));
}

#[tokio::test]
async fn reinstall_reuses_runtime_and_replaces_registration() {
    let port = ServicePort::new(5050).unwrap();
    let h = Harness::builder()
        .prompt(ScriptedPrompt::new(None, Some(port), false))
        .build();

    Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();
    let first_ops = h.services.ops().len();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(summary.runtime_reused);
    assert_eq!(h.fetcher.request_count(), 1);
    assert_eq!(summary.port, 5050);

    let mut expected = vec![op(ServiceOp::Stop), op(ServiceOp::Remove)];
    expected.extend(fresh_install_ops());
    assert_eq!(h.services.ops()[first_ops..], expected[..]);
    assert_eq!(
        h.config.snapshot("whisper-api", ConfigScope::Environment)["WHISPER_PORT"],
        "5050"
    );
}

#[tokio::test]
async fn corrupted_runtime_is_rebuilt() {
    let h = Harness::builder().build();
    let python = h.python();
    std::fs::create_dir_all(python.parent().unwrap()).unwrap();
    std::fs::write(&python, b"truncated").unwrap();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(!summary.runtime_reused);
    assert_eq!(std::fs::read(&python).unwrap(), b"GOOD");
    assert_eq!(h.fetcher.request_count(), 1);
}

#[tokio::test]
async fn foreign_listener_on_port_is_a_warning() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let bound = listener.local_addr().unwrap().port();
    let h = Harness::builder()
        .prompt(ScriptedPrompt::new(
            None,
            Some(ServicePort::new(bound).unwrap()),
            false,
        ))
        .build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert_eq!(summary.port_disposition, PortDisposition::OwnedByOther);
    assert!(summary.warnings.iter().any(|w| w.contains(&bound.to_string())));
}

#[tokio::test]
async fn foreign_listener_answer_is_not_taken_as_service_health() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let bound = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                .await;
        }
    });
    let h = Harness::builder()
        .prompt(ScriptedPrompt::new(
            None,
            Some(ServicePort::new(bound).unwrap()),
            false,
        ))
        .build();

    let summary = Installer::new(h.context("install").with_health_timeout(Duration::from_secs(5)))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert_eq!(summary.port_disposition, PortDisposition::OwnedByOther);
    assert_eq!(summary.start, StartOutcome::Started);
    assert!(summary.warnings.iter().any(|w| w.contains("Health check skipped")));
}

#[tokio::test]
async fn own_listener_on_recorded_port_is_an_upgrade() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let bound = listener.local_addr().unwrap().port();
    let h = Harness::builder()
        .services(existing_service(ServiceStatus::Running))
        .prompt(ScriptedPrompt::new(
            None,
            Some(ServicePort::new(bound).unwrap()),
            false,
        ))
        .build();
    h.config
        .write("whisper-api", ConfigScope::Installation, "port", &bound.to_string())
        .await
        .unwrap();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert_eq!(summary.port_disposition, PortDisposition::OwnedBySelf);
    assert!(!summary.warnings.iter().any(|w| w.contains(&bound.to_string())));
}

#[tokio::test]
async fn listener_on_recorded_port_without_service_is_foreign() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let bound = listener.local_addr().unwrap().port();
    let h = Harness::builder()
        .prompt(ScriptedPrompt::new(
            None,
            Some(ServicePort::new(bound).unwrap()),
            false,
        ))
        .build();
    h.config
        .write("whisper-api", ConfigScope::Installation, "port", &bound.to_string())
        .await
        .unwrap();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert_eq!(summary.port_disposition, PortDisposition::OwnedByOther);
    assert!(summary.warnings.iter().any(|w| w.contains(&bound.to_string())));
}

#[tokio::test]
async fn start_failure_does_not_fail_install() {
    let h = Harness::builder()
        .services(MemoryServiceManager::default().failing_start())
        .build();

    let summary = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();

    assert!(matches!(summary.start, StartOutcome::Failed(_)));
    assert!(summary.warnings.iter().any(|w| w.contains("next boot")));
    assert!(h.services.registration("whisper-api").is_some());
}

#[tokio::test]
async fn runtime_download_failure_is_fatal() {
    let h = Harness::builder().without_runtime_download().build();

    let failure = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "ProvisionRuntime");
    assert!(failure.secondary_log().is_some());
    assert!(h.services.ops().is_empty());
    assert!(!h.layout().runtime_dir().exists());
}

fn failing_support_batch(spec: &CommandSpec) -> Option<Result<CommandOutput, CommandError>> {
    spec.args.iter().any(|a| a == "faster-whisper").then(|| {
        Ok(CommandOutput {
            code: Some(1),
            stdout: "Collecting faster-whisper\n".to_string(),
            stderr: "ERROR: No matching distribution found for faster-whisper".to_string(),
        })
    })
}

#[tokio::test]
async fn package_batch_failure_is_fatal_with_tool_output() {
    let h = Harness::builder().rule(failing_support_batch).build();

    let failure = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "InstallDependencies");
    assert!(failure.to_string().contains("No matching distribution"));
    assert!(h.services.ops().is_empty());
}

#[tokio::test]
async fn payload_scripts_are_staged() {
    let h = Harness::builder().build();
    let payload = tempfile::TempDir::new().unwrap();
    std::fs::write(payload.path().join("server.py"), "app = None\n").unwrap();
    std::fs::write(payload.path().join("whisper_service.py"), "# host\n").unwrap();

    let mut request = InstallRequest::new(&h.install_path);
    request.payload_dir = Some(payload.path().to_path_buf());
    let summary = Installer::new(h.context("install"))
        .run(request)
        .await
        .unwrap();

    assert!(h.layout().server_script().is_file());
    assert!(!summary.warnings.iter().any(|w| w.contains("is missing")));
}

#[tokio::test]
async fn failed_command_output_is_written_to_both_install_logs() {
    let h = Harness::builder().rule(failing_support_batch).build();
    let ctx = h.context("install");
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(ctx.log.clone())
        .with_ansi(false)
        .with_filter(EnvFilter::new("whisvc=debug,warn"));
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(file_layer));

    let failure = Installer::new(ctx)
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "InstallDependencies");
    let primary = std::fs::read_to_string(failure.primary_log()).unwrap();
    assert!(primary.contains("Command failed"));
    assert!(primary.contains("Collecting faster-whisper"));
    assert!(primary.contains("No matching distribution found for faster-whisper"));
    assert!(primary.contains("Running command"));

    let secondary = std::fs::read_to_string(failure.secondary_log().unwrap()).unwrap();
    assert!(secondary.contains("No matching distribution found for faster-whisper"));
}

#[tokio::test]
async fn aborted_upgrade_leaves_live_registration_untouched() {
    let h = Harness::builder()
        .services(existing_service(ServiceStatus::Running))
        .rule(failing_support_batch)
        .build();
    h.config
        .write("whisper-api", ConfigScope::Environment, "WHISPER_PORT", "5000")
        .await
        .unwrap();
    h.config
        .write("whisper-api", ConfigScope::Environment, "WHISPER_MODEL", "medium")
        .await
        .unwrap();

    let failure = Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "InstallDependencies");
    assert!(h.services.registration("whisper-api").is_some());
    assert!(
        !h.services
            .ops()
            .iter()
            .any(|op| matches!(op, ServiceOp::Remove(_) | ServiceOp::Create(_)))
    );
    let env = h.config.snapshot("whisper-api", ConfigScope::Environment);
    assert_eq!(env.len(), 2);
    assert_eq!(env["WHISPER_PORT"], "5000");
    assert_eq!(env["WHISPER_MODEL"], "medium");
}
