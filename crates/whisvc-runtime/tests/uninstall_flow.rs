//! End-to-end uninstall flow, on its own and after an install.

mod common;

use common::Harness;
use whisvc_core::{ConfigScope, ProcessTable};
use whisvc_core::testing::{ServiceOp, StaticHostProbe};
use whisvc_runtime::{InstallError, InstallRequest, Installer, UninstallRequest, Uninstaller};

async fn install(h: &Harness) {
    Installer::new(h.context("install"))
        .run(InstallRequest::new(&h.install_path))
        .await
        .unwrap();
}

fn request(h: &Harness, keep_install_dir: bool) -> UninstallRequest {
    UninstallRequest {
        install_path: h.install_path.clone(),
        keep_install_dir,
    }
}

#[tokio::test]
async fn full_uninstall_removes_everything_and_repeats_cleanly() {
    let h = Harness::builder().build();
    install(&h).await;

    let summary = Uninstaller::new(h.context("uninstall"))
        .run(request(&h, false))
        .await
        .unwrap();

    assert!(summary.was_registered);
    assert!(summary.was_running);
    assert!(!summary.purged);
    assert!(h.services.registration("whisper-api").is_none());
    assert!(h.config.is_empty_for("whisper-api"));
    assert!(!h.layout().runtime_dir().exists());
    assert!(!h.layout().logs_dir().exists());
    assert!(summary.removed.contains(&h.layout().runtime_dir()));
    assert!(!h.install_path.exists());

    let again = Uninstaller::new(h.context("uninstall"))
        .run(request(&h, false))
        .await
        .unwrap();
    assert!(again.was_noop());
    assert!(again.warnings.is_empty());
}

#[tokio::test]
async fn keeping_install_dir_preserves_runtime_and_record() {
    let h = Harness::builder().build();
    install(&h).await;

    let summary = Uninstaller::new(h.context("uninstall"))
        .run(request(&h, true))
        .await
        .unwrap();

    assert!(summary.kept_install_dir);
    assert!(summary.removed.is_empty());
    assert!(h.services.registration("whisper-api").is_none());
    assert!(
        h.config
            .snapshot("whisper-api", ConfigScope::Environment)
            .is_empty()
    );
    assert!(
        !h.config
            .snapshot("whisper-api", ConfigScope::Installation)
            .is_empty()
    );
    assert!(h.python().is_file());
}

#[tokio::test]
async fn stray_processes_under_install_path_are_terminated() {
    let h = Harness::builder()
        .stray(4242, "python/bin/python3")
        .process(7, "/usr/bin/unrelated".into())
        .build();

    let summary = Uninstaller::new(h.context("uninstall"))
        .run(request(&h, false))
        .await
        .unwrap();

    assert_eq!(summary.terminated, vec![4242]);
    assert_eq!(h.processes.killed(), vec![4242]);
    assert!(!summary.was_noop());
}

#[tokio::test]
async fn uninstaller_inside_install_path_finishes_teardown() {
    let me = std::process::id();
    let h = Harness::builder().stray(me, "whisvc").build();
    install(&h).await;

    let summary = Uninstaller::new(h.context("uninstall"))
        .run(request(&h, false))
        .await
        .unwrap();

    assert!(summary.terminated.is_empty());
    assert!(h.processes.killed().is_empty());
    assert!(h.processes.is_alive(me));
    assert!(h.services.registration("whisper-api").is_none());
    assert!(h.config.is_empty_for("whisper-api"));
    assert!(!h.install_path.exists());
}

#[tokio::test]
async fn uninstall_requires_privilege() {
    let h = Harness::builder().host(StaticHostProbe::standard()).build();

    let failure = Uninstaller::new(h.context("uninstall"))
        .run(request(&h, false))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, "StopService");
    assert!(matches!(failure.error, InstallError::NotElevated));
    assert!(h.services.ops().is_empty());
}

#[tokio::test]
async fn running_service_is_stopped_before_removal() {
    let h = Harness::builder().build();
    install(&h).await;
    let before = h.services.ops().len();

    Uninstaller::new(h.context("uninstall"))
        .run(request(&h, false))
        .await
        .unwrap();

    assert_eq!(
        h.services.ops()[before..],
        [
            ServiceOp::Stop("whisper-api".to_string()),
            ServiceOp::Remove("whisper-api".to_string()),
        ]
    );
}
