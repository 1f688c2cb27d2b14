//! Main commands enum.
//!
//! This module defines the available commands for the CLI tool.

use std::path::PathBuf;

use clap::Subcommand;

/// Available commands for the service installer.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install or upgrade the transcription service
    Install {
        /// Install directory; defaults to $WHISVC_INSTALL_DIR or the platform location
        #[arg(long = "install-path")]
        install_path: Option<PathBuf>,
        /// Run without operator prompts (currently rejected)
        #[arg(long)]
        unattended: bool,
        /// Directory holding whisper_service.py and server.py to stage
        #[arg(long = "payload-dir")]
        payload_dir: Option<PathBuf>,
    },

    /// Stop and remove the service and everything it installed
    Uninstall {
        /// Install directory; defaults to the recorded one
        #[arg(long = "install-path")]
        install_path: Option<PathBuf>,
        /// Leave the runtime, logs and installation record on disk
        #[arg(long = "keep-install-dir")]
        keep_install_dir: bool,
    },

    /// Show service status, recorded installation and GPU capability
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Report GPU capability and the recommended build
    Detect {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}
