//! Host checks run before anything is touched.
//!
//! Privilege is the only fatal check and runs first. The others are
//! independent and all run; each failure becomes a warning.

use tracing::{info, warn};
use whisvc_core::{ElevatedToken, HostProbe};

use super::error::InstallError;

#[derive(Debug)]
pub struct PreflightReport {
    pub token: ElevatedToken,
    pub warnings: Vec<String>,
}

pub async fn run_preflight(host: &dyn HostProbe) -> Result<PreflightReport, InstallError> {
    let privilege = host.privilege().await;
    let token = privilege.require().ok_or(InstallError::NotElevated)?;
    info!(%privilege, "Privilege check passed");

    let mut warnings = Vec::new();

    if host.has_connectivity().await {
        info!("Package index reachable");
    } else {
        let msg = "Could not reach the package index. Downloads may fail if the network \
                   is unavailable or a proxy is required."
            .to_string();
        warn!("{msg}");
        warnings.push(msg);
    }

    match host.media_tool().await {
        Some(path) => info!(ffmpeg = %path.display(), "Audio decoder found"),
        None => {
            let msg = "ffmpeg was not found on PATH. Install it before transcribing formats \
                       other than WAV."
                .to_string();
            warn!("{msg}");
            warnings.push(msg);
        }
    }

    Ok(PreflightReport { token, warnings })
}
