//! CLI entry point - the composition root.

use std::process::ExitCode;

use clap::Parser;
use whisvc_core::settings::SERVICE_NAME;
use whisvc_runtime::InstallLog;

use whisvc_cli::handlers::install::InstallArgs;
use whisvc_cli::handlers::uninstall::UninstallArgs;
use whisvc_cli::{Cli, CliConfig, CliError, Commands, Platform, handlers, logging};

/// Create the run's install log and route tracing into it.
fn open_flow_log(flow: &str, verbose: bool) -> Result<InstallLog, CliError> {
    let log = InstallLog::create(flow)?;
    logging::init_logging(verbose, Some(&log));
    Ok(log)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig::for_terminal(cli.verbose);

    match cli.command {
        Commands::Install {
            install_path,
            unattended,
            payload_dir,
        } => {
            let log = open_flow_log("install", cli.verbose)?;
            let platform = Platform::detect().await?;
            let args = InstallArgs {
                install_path,
                unattended,
                payload_dir,
            };
            handlers::install::execute(&platform, log, config, args).await
        }
        Commands::Uninstall {
            install_path,
            keep_install_dir,
        } => {
            let log = open_flow_log("uninstall", cli.verbose)?;
            let platform = Platform::detect().await?;
            let args = UninstallArgs {
                install_path,
                keep_install_dir,
            };
            handlers::uninstall::execute(&platform, log, config, args).await
        }
        Commands::Status { json } => {
            logging::init_logging(cli.verbose, None);
            let platform = Platform::detect().await?;
            handlers::status::execute(&platform, SERVICE_NAME, json).await
        }
        Commands::Detect { json } => {
            logging::init_logging(cli.verbose, None);
            let platform = Platform::detect().await?;
            handlers::detect::execute(&platform, json).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Flow failures were already reported with their phase and logs.
        Err(CliError::Flow(_)) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
