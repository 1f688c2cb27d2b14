//! Install and uninstall flows.
//!
//! Both are forward-only state machines over the ports in [`InstallContext`].
//! A failure is reported as [`InstallFailure`] carrying the phase it happened
//! in and where the logs are.

mod context;
mod error;
mod installer;
mod payload;
mod preflight;
mod summary;
mod uninstaller;

pub use context::{Adapters, InstallContext};
pub use error::{InstallError, InstallFailure};
pub use installer::{InstallRequest, Installer, service_registration};
pub use payload::stage_scripts;
pub use preflight::{PreflightReport, run_preflight};
pub use summary::{InstallSummary, UninstallSummary};
pub use uninstaller::{UninstallRequest, Uninstaller};
