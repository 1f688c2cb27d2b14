//! Accelerator capability detection via `nvidia-smi`.
//!
//! Detection never fails the caller: every problem (tool missing, tool
//! erroring, unexpected output) becomes a "not found" report with a reason.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use whisvc_core::{CapabilityReport, CapabilityVersion, CommandRunner, CommandSpec};

use crate::command::run_logged;

const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Reasons a query produced no usable device. Folded into the report.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("nvidia-smi not found")]
    ToolNotFound,

    #[error("nvidia-smi could not be run: {0}")]
    Run(String),

    #[error("nvidia-smi exited with code {code}: {detail}")]
    QueryFailed { code: String, detail: String },

    #[error("nvidia-smi reported no devices")]
    NoDevice,

    #[error("nvidia-smi returned unexpected output: {0}")]
    Malformed(String),
}

/// Locates the query tool and classifies the first device it reports.
pub struct CapabilityDetector {
    runner: Arc<dyn CommandRunner>,
    candidates: Vec<PathBuf>,
    search_path: bool,
}

impl CapabilityDetector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            candidates: well_known_locations(),
            search_path: true,
        }
    }

    /// Only look at `candidates`; never consult `PATH`.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self.search_path = false;
        self
    }

    pub async fn detect(&self) -> CapabilityReport {
        let report = match self.query().await {
            Ok(report) => report,
            Err(e) => {
                debug!(reason = %e, "No usable accelerator");
                CapabilityReport::not_found(e.to_string())
            }
        };
        info!(
            device_found = report.device_found(),
            compatible = report.compatible(),
            reason = %report.reason(),
            "Capability detection finished"
        );
        report
    }

    fn locate_tool(&self) -> Option<PathBuf> {
        if let Some(found) = self.candidates.iter().find(|p| p.is_file()) {
            return Some(found.clone());
        }
        if self.search_path {
            return which::which("nvidia-smi").ok();
        }
        None
    }

    async fn query(&self) -> Result<CapabilityReport, CapabilityError> {
        let tool = self.locate_tool().ok_or(CapabilityError::ToolNotFound)?;
        debug!(tool = %tool.display(), "Querying accelerator");

        let spec = CommandSpec::new(&tool)
            .arg("--query-gpu=name,driver_version,compute_cap")
            .arg("--format=csv,noheader")
            .timeout(QUERY_TIMEOUT);
        let output = run_logged(self.runner.as_ref(), &spec)
            .await
            .map_err(|e| CapabilityError::Run(e.to_string()))?;

        if !output.success() {
            return Err(CapabilityError::QueryFailed {
                code: output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                detail: output.detail(),
            });
        }

        let line = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or(CapabilityError::NoDevice)?;
        parse_query_line(line)
    }
}

/// Classify one `name, driver_version, compute_cap` CSV line.
pub fn parse_query_line(line: &str) -> Result<CapabilityReport, CapabilityError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, driver, capability] = fields.as_slice() else {
        return Err(CapabilityError::Malformed(line.to_string()));
    };
    if name.is_empty() {
        return Err(CapabilityError::Malformed(line.to_string()));
    }
    Ok(CapabilityReport::classify(
        *name,
        *driver,
        CapabilityVersion::parse(capability),
    ))
}

fn well_known_locations() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let mut paths = Vec::new();
        if let Some(program_files) = std::env::var_os("ProgramFiles") {
            paths.push(
                PathBuf::from(program_files)
                    .join("NVIDIA Corporation")
                    .join("NVSMI")
                    .join("nvidia-smi.exe"),
            );
        }
        if let Some(system_root) = std::env::var_os("SystemRoot") {
            paths.push(
                PathBuf::from(system_root)
                    .join("System32")
                    .join("nvidia-smi.exe"),
            );
        }
        paths
    }

    #[cfg(not(windows))]
    {
        vec![
            PathBuf::from("/usr/bin/nvidia-smi"),
            PathBuf::from("/usr/local/bin/nvidia-smi"),
            PathBuf::from("/usr/local/nvidia/bin/nvidia-smi"),
        ]
    }
}
