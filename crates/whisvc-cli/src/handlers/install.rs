//! Install command handler.

use std::path::PathBuf;
use std::sync::Arc;

use whisvc_core::default_install_path;
use whisvc_runtime::{InstallLog, InstallRequest, Installer};

use crate::bootstrap::{CliConfig, Platform, flow_context};
use crate::error::CliError;
use crate::presentation::{render_failure, render_install_summary};
use crate::prompt::ConsolePrompt;

/// Directory name searched next to the executable for the service scripts.
const PAYLOAD_DIR_NAME: &str = "payload";

#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    pub install_path: Option<PathBuf>,
    pub unattended: bool,
    pub payload_dir: Option<PathBuf>,
}

impl InstallArgs {
    pub fn into_request(self, bundled_payload: Option<PathBuf>) -> InstallRequest {
        let mut request = InstallRequest::new(self.install_path.unwrap_or_else(default_install_path));
        request.unattended = self.unattended;
        request.payload_dir = self.payload_dir.or(bundled_payload);
        request
    }
}

/// `payload/` beside the running executable, when it exists.
fn bundled_payload_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.join(PAYLOAD_DIR_NAME);
    dir.is_dir().then_some(dir)
}

/// Execute the install command.
///
/// Prints the summary on success (warnings included) and the failed phase
/// with both log locations on failure.
pub async fn execute(
    platform: &Platform,
    log: InstallLog,
    config: CliConfig,
    args: InstallArgs,
) -> Result<(), CliError> {
    let request = args.into_request(bundled_payload_dir());
    tracing::info!(
        install_path = %request.install_path.display(),
        payload = ?request.payload_dir,
        "Starting install"
    );

    let adapters = platform.adapters(Arc::new(ConsolePrompt::stdio()));
    let installer = Installer::new(flow_context(adapters, log, config));

    match installer.run(request).await {
        Ok(summary) => {
            println!();
            print!("{}", render_install_summary(&summary));
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

    #[test]
    fn explicit_payload_wins_over_bundled() {
        let args = InstallArgs {
            install_path: Some(PathBuf::from("/srv/whisper")),
            unattended: false,
            payload_dir: Some(PathBuf::from("/tmp/scripts")),
        };
        let request = args.into_request(Some(PathBuf::from("/usr/lib/whisvc/payload")));
        assert_eq!(request.install_path, PathBuf::from("/srv/whisper"));
        assert_eq!(request.payload_dir, Some(PathBuf::from("/tmp/scripts")));
    }

    #[test]
    fn bundled_payload_is_the_fallback() {
        let args = InstallArgs {
            install_path: Some(PathBuf::from("/srv/whisper")),
            unattended: true,
            payload_dir: None,
        };
        let request = args.into_request(Some(PathBuf::from("/usr/lib/whisvc/payload")));
        assert!(request.unattended);
        assert_eq!(
            request.payload_dir,
            Some(PathBuf::from("/usr/lib/whisvc/payload"))
        );
    }
}
