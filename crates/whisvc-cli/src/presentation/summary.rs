//! Final reports for the install and uninstall flows.

use std::fmt::Write as _;

use console::style;
use whisvc_runtime::{InstallFailure, InstallSummary, LogLocations, StartOutcome, UninstallSummary};

use super::print_separator;

fn write_logs(out: &mut String, logs: &LogLocations) {
    let _ = writeln!(out, "  Install log:     {}", logs.primary.display());
    if let Some(secondary) = &logs.secondary {
        let _ = writeln!(out, "  Install log copy: {}", secondary.display());
    }
}

fn write_warnings(out: &mut String, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    let _ = writeln!(out);
    for warning in warnings {
        let _ = writeln!(out, "{} {warning}", style("WARNING:").yellow().bold());
    }
}

pub fn render_install_summary(summary: &InstallSummary) -> String {
    let mut out = String::new();
    let headline = if summary.has_warnings() {
        style("Installation completed with warnings").yellow().bold()
    } else {
        style("Installation completed").green().bold()
    };
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out, "{}", print_separator(60));

    let _ = writeln!(out, "  Service:         {}", summary.service_name);
    let _ = writeln!(out, "  Install path:    {}", summary.install_path.display());
    let reused = if summary.runtime_reused { " (reused)" } else { "" };
    let _ = writeln!(out, "  Runtime:         {}{reused}", summary.runtime_path.display());
    let _ = writeln!(out, "  Model:           {}", summary.model);
    let _ = writeln!(
        out,
        "  Endpoint:        http://127.0.0.1:{} ({})",
        summary.port, summary.port_disposition
    );
    let _ = writeln!(
        out,
        "  Acceleration:    {} (torch {})",
        summary.acceleration.label(),
        summary.torch
    );
    let _ = writeln!(out, "  GPU:             {}", summary.capability.reason());

    let state = match &summary.start {
        StartOutcome::Started => style("running".to_string()).green(),
        StartOutcome::Failed(reason) => style(format!("not started ({reason})")).red(),
    };
    let _ = writeln!(out, "  Service state:   {state}");

    for location in &summary.config_locations {
        let _ = writeln!(out, "  Configuration:   {location}");
    }
    for path in &summary.service_logs {
        let _ = writeln!(out, "  Service log:     {}", path.display());
    }
    write_logs(&mut out, &summary.logs);
    write_warnings(&mut out, &summary.warnings);
    out
}

pub fn render_uninstall_summary(summary: &UninstallSummary) -> String {
    let mut out = String::new();
    if summary.was_noop() {
        let _ = writeln!(
            out,
            "{} was not installed at {}; nothing to remove.",
            summary.service_name,
            summary.install_path.display()
        );
        write_logs(&mut out, &summary.logs);
        return out;
    }

    let _ = writeln!(out, "{}", style("Uninstall completed").green().bold());
    let _ = writeln!(out, "{}", print_separator(60));
    let _ = writeln!(out, "  Service:         {}", summary.service_name);
    let registration = match (summary.was_registered, summary.purged) {
        (false, _) => "not registered",
        (true, false) => "removed",
        (true, true) => "removed (purged from the service database)",
    };
    let _ = writeln!(out, "  Registration:    {registration}");
    if summary.was_running {
        let _ = writeln!(out, "  Stopped:         yes");
    }
    if !summary.terminated.is_empty() {
        let pids: Vec<String> = summary.terminated.iter().map(u32::to_string).collect();
        let _ = writeln!(out, "  Terminated:      {}", pids.join(", "));
    }
    for path in &summary.removed {
        let _ = writeln!(out, "  Removed:         {}", path.display());
    }
    if summary.kept_install_dir {
        let _ = writeln!(out, "  Kept:            {}", summary.install_path.display());
    }
    write_logs(&mut out, &summary.logs);
    write_warnings(&mut out, &summary.warnings);
    out
}

pub fn render_failure(failure: &InstallFailure) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} failed: {}",
        style("ERROR:").red().bold(),
        failure.phase,
        failure.error
    );
    let _ = writeln!(out, "  Install log:     {}", failure.primary_log().display());
    if let Some(secondary) = failure.secondary_log() {
        let _ = writeln!(out, "  Install log copy: {}", secondary.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use whisvc_core::{AccelerationChoice, CapabilityReport, ModelTier, PortDisposition};
    use whisvc_runtime::InstallError;
    use whisvc_runtime::python::TorchVariant;

    fn logs() -> LogLocations {
        LogLocations {
            primary: PathBuf::from("/tmp/whisvc-install-20240101-000000-abcd1234.log"),
            secondary: Some(PathBuf::from("/opt/whisper-api/logs/install.log")),
            secondary_failures: 0,
        }
    }

    fn install_summary(start: StartOutcome, warnings: Vec<String>) -> InstallSummary {
        InstallSummary {
            service_name: "whisper-api".to_string(),
            install_path: PathBuf::from("/opt/whisper-api"),
            runtime_path: PathBuf::from("/opt/whisper-api/python"),
            model: ModelTier::Small,
            port: 4444,
            port_disposition: PortDisposition::Available,
            capability: CapabilityReport::not_found("nvidia-smi not found"),
            acceleration: AccelerationChoice::cpu(),
            torch: TorchVariant::Cpu,
            runtime_reused: true,
            start,
            warnings,
            logs: logs(),
            service_logs: vec![PathBuf::from("/opt/whisper-api/logs/stdout.log")],
            config_locations: vec!["/etc/whisvc/whisper-api/environment.env".to_string()],
        }
    }

    #[test]
    fn install_summary_lists_endpoint_and_both_logs() {
        let text = render_install_summary(&install_summary(StartOutcome::Started, Vec::new()));
        assert!(text.contains("Installation completed"));
        assert!(!text.contains("with warnings"));
        assert!(text.contains("http://127.0.0.1:4444"));
        assert!(text.contains("(reused)"));
        assert!(text.contains("/opt/whisper-api/logs/install.log"));
        assert!(text.contains("whisvc-install-20240101"));
        assert!(text.contains("environment.env"));
    }

    #[test]
    fn degraded_install_shows_warning_banners() {
        let text = render_install_summary(&install_summary(
            StartOutcome::Failed("port in use".to_string()),
            vec!["Service did not start; it will start on next boot".to_string()],
        ));
        assert!(text.contains("completed with warnings"));
        assert!(text.contains("WARNING:"));
        assert!(text.contains("next boot"));
        assert!(text.contains("not started (port in use)"));
    }

    #[test]
    fn noop_uninstall_says_so() {
        let summary = UninstallSummary {
            service_name: "whisper-api".to_string(),
            install_path: PathBuf::from("/opt/whisper-api"),
            was_registered: false,
            was_running: false,
            purged: false,
            terminated: Vec::new(),
            removed: Vec::new(),
            kept_install_dir: false,
            warnings: Vec::new(),
            logs: logs(),
        };
        assert!(render_uninstall_summary(&summary).contains("nothing to remove"));
    }

    #[test]
    fn failure_names_phase_and_logs() {
        let failure = InstallFailure {
            phase: "ProvisionRuntime",
            error: InstallError::NotElevated,
            logs: logs(),
        };
        let text = render_failure(&failure);
        assert!(text.contains("ProvisionRuntime failed"));
        assert!(text.contains("whisvc-install-20240101"));
        assert!(text.contains("/opt/whisper-api/logs/install.log"));
    }
}
