//! Service scripts shipped beside the installer.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use whisvc_core::InstallLayout;

use super::error::InstallError;

const SCRIPTS: [&str; 2] = ["whisper_service.py", "server.py"];

/// Copy the service scripts from `payload_dir` into the install root.
///
/// Scripts absent from `payload_dir` are skipped; whatever is already in the
/// install root (placed there by a package manager) is left alone in that
/// case. Returns the files copied.
pub fn stage_scripts(payload_dir: &Path, layout: &InstallLayout) -> Result<Vec<PathBuf>, InstallError> {
    let mut copied = Vec::new();
    for name in SCRIPTS {
        let source = payload_dir.join(name);
        if !source.is_file() {
            debug!(script = %source.display(), "Not in payload; skipping");
            continue;
        }
        let dest = layout.root().join(name);
        if source == dest {
            continue;
        }
        std::fs::copy(&source, &dest).map_err(|e| InstallError::fs("copy", &dest, e))?;
        info!(script = %dest.display(), "Service script staged");
        copied.push(dest);
    }
    Ok(copied)
}
