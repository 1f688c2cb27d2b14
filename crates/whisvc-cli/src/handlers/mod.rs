//! Command handlers.
//!
//! Handlers follow one pattern: take the composed [`Platform`] plus parsed
//! arguments, run one flow or query in `whisvc-runtime`, and render the
//! outcome through [`crate::presentation`]. They contain no OS logic.
//!
//! [`Platform`]: crate::bootstrap::Platform

pub mod detect;
pub mod install;
pub mod status;
pub mod uninstall;
