//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Installer and lifecycle manager for the Whisper API transcription service.
#[derive(Parser, Debug)]
#[command(name = "whisvc")]
#[command(about = "Install, inspect and remove the Whisper API service")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
