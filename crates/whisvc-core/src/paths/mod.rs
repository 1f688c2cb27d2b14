//! Path resolution for install locations and persisted configuration.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - Environment overrides are read in thin wrappers; the resolution rules
//!   themselves are pure functions so tests never touch process environment
//! - No filesystem mutation happens here

mod config;
mod error;
mod install;

pub use config::{CONFIG_DIR_ENV, config_root, resolve_config_root};
pub use error::PathError;
pub use install::{INSTALL_DIR_ENV, InstallLayout, default_install_path, platform_install_path};
