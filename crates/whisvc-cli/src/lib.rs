//! Command-line front end for whisvc.
//!
//! Parses arguments, wires the platform adapters, installs logging, and
//! renders flow outcomes. All install logic lives in `whisvc-runtime`.

#![deny(unsafe_code)]

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;
pub mod presentation;
pub mod prompt;
pub mod utils;

pub use bootstrap::{CliConfig, Platform};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
