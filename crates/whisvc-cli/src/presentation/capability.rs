//! Capability and status reports.

use std::fmt::Write as _;

use console::style;
use serde::Serialize;
use whisvc_core::{CapabilityReport, InstallationState, Recommendation, ServiceStatus};

use super::print_separator;

pub fn render_capability(report: &CapabilityReport) -> String {
    let mut out = String::new();
    match report.device_name() {
        Some(name) => {
            let _ = writeln!(out, "  GPU:             {name}");
            if let Some(driver) = report.driver_version() {
                let _ = writeln!(out, "  Driver:          {driver}");
            }
            if let Some(capability) = report.capability() {
                let family = report
                    .architecture()
                    .map_or_else(String::new, |f| format!(" ({f})"));
                let _ = writeln!(out, "  Compute:         {capability}{family}");
            }
        }
        None => {
            let _ = writeln!(out, "  GPU:             none detected");
        }
    }

    let recommendation = match report.recommendation() {
        Recommendation::Accelerated => style("GPU build (CUDA), operator confirms at install").green(),
        Recommendation::CpuOnly => style("CPU build (int8)").yellow(),
    };
    let _ = writeln!(out, "  Recommendation:  {recommendation}");
    let _ = writeln!(out, "  Reason:          {}", report.reason());
    out
}

/// Everything `whisvc status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub service_name: String,
    pub service: ServiceStatus,
    pub installation: Option<InstallationState>,
    pub capability: CapabilityReport,
    pub config_location: String,
}

pub fn render_status(view: &StatusView) -> String {
    let mut out = String::new();
    let status = match &view.service {
        ServiceStatus::Running => style(view.service.to_string()).green(),
        ServiceStatus::NotInstalled => style(view.service.to_string()).dim(),
        _ => style(view.service.to_string()).yellow(),
    };
    let _ = writeln!(out, "{} {status}", style(&view.service_name).bold());
    let _ = writeln!(out, "{}", print_separator(60));

    match &view.installation {
        Some(state) => {
            let _ = writeln!(out, "  Install path:    {}", state.install_path.display());
            let _ = writeln!(out, "  Runtime:         {}", state.runtime_path.display());
            let _ = writeln!(out, "  Model:           {}", state.model);
            let _ = writeln!(out, "  Endpoint:        http://127.0.0.1:{}", state.port);
            let _ = writeln!(out, "  Acceleration:    {}", state.acceleration.label());
            if let Some(at) = state.installed_at {
                let _ = writeln!(out, "  Installed:       {}", at.to_rfc3339());
            }
        }
        None => {
            let _ = writeln!(out, "  No installation recorded in {}", view.config_location);
        }
    }

    let _ = writeln!(out);
    out.push_str(&render_capability(&view.capability));
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use whisvc_core::{
        AccelerationChoice, CapabilityVersion, ModelTier, ParsedCapability, ServicePort,
    };

    #[test]
    fn compatible_device_recommends_gpu_build() {
        let report = CapabilityReport::classify(
            "NVIDIA GeForce RTX 3060",
            "550.54",
            ParsedCapability::Version(CapabilityVersion::new(8, 6)),
        );
        let text = render_capability(&report);
        assert!(text.contains("RTX 3060"));
        assert!(text.contains("8.6 (Ampere (2020))"));
        assert!(text.contains("GPU build"));
    }

    #[test]
    fn missing_device_recommends_cpu_build() {
        let text = render_capability(&CapabilityReport::not_found("nvidia-smi not found"));
        assert!(text.contains("none detected"));
        assert!(text.contains("CPU build"));
        assert!(text.contains("nvidia-smi not found"));
    }

    #[test]
    fn status_without_record_points_at_config_location() {
        let view = StatusView {
            service_name: "whisper-api".to_string(),
            service: ServiceStatus::NotInstalled,
            installation: None,
            capability: CapabilityReport::not_found("nvidia-smi not found"),
            config_location: "/etc/whisvc".to_string(),
        };
        let text = render_status(&view);
        assert!(text.contains("not installed"));
        assert!(text.contains("No installation recorded in /etc/whisvc"));
    }

    #[test]
    fn status_with_record_shows_endpoint() {
        let view = StatusView {
            service_name: "whisper-api".to_string(),
            service: ServiceStatus::Running,
            installation: Some(InstallationState {
                service_name: "whisper-api".to_string(),
                install_path: PathBuf::from("/opt/whisper-api"),
                runtime_path: PathBuf::from("/opt/whisper-api/python"),
                model: ModelTier::Medium,
                port: ServicePort::new(5050).unwrap(),
                acceleration: AccelerationChoice::cpu(),
                installed_at: None,
            }),
            capability: CapabilityReport::not_found("nvidia-smi not found"),
            config_location: "/etc/whisvc".to_string(),
        };
        let text = render_status(&view);
        assert!(text.contains("running"));
        assert!(text.contains("http://127.0.0.1:5050"));
        assert!(text.contains("medium"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["service"], "Running");
        assert_eq!(json["installation"]["port"], 5050);
    }
}
