//! Terminal presentation for CLI commands.
//!
//! Renderers return the text instead of printing it, so handlers decide
//! where it goes and tests can inspect it.

pub mod capability;
pub mod summary;

pub use capability::{StatusView, render_capability, render_status};
pub use summary::{render_failure, render_install_summary, render_uninstall_summary};

/// A horizontal rule of `width` characters.
pub fn print_separator(width: usize) -> String {
    "-".repeat(width)
}
