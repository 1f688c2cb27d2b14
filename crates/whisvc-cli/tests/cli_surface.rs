//! Integration tests for the `whisvc` binary's command surface.
//!
//! Only read-only commands are run; install and uninstall are covered by the
//! runtime crate's flow tests against in-memory adapters.

use std::process::{Command, Output};

fn whisvc(args: &[&str], config_dir: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_whisvc"))
        .args(args)
        .env("WHISVC_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "off")
        .output()
        .expect("spawn whisvc")
}

#[test]
fn help_lists_every_command() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = whisvc(&["--help"], temp.path());
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    for command in ["install", "uninstall", "status", "detect"] {
        assert!(text.contains(command), "help is missing '{command}'");
    }
}

#[test]
fn missing_command_is_a_usage_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = whisvc(&[], temp.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = whisvc(&["install", "--no-such-flag"], temp.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn detect_json_is_machine_readable() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = whisvc(&["detect", "--json"], temp.path());
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["device_found"].is_boolean());
    assert!(report["compatible"].is_boolean());
    assert!(report["reason"].as_str().is_some_and(|r| !r.is_empty()));
}
