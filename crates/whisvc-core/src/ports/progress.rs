//! One-way progress surface for the install and uninstall flows.
//!
//! The surface is optional and may run on its own thread. Its failures are
//! reported back as [`ProgressError`] so the caller can log them, but the
//! flows never branch on them.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// The display side has gone away (window closed, thread exited).
    #[error("Progress display is no longer connected")]
    Disconnected,

    #[error("Progress display rejected update: {0}")]
    Rejected(String),
}

/// Receives status updates while a flow runs.
pub trait ProgressSink: Send + Sync {
    /// A new phase started. `index` is zero-based out of `total`.
    fn phase(&self, name: &str, index: usize, total: usize) -> Result<(), ProgressError>;

    /// Free-form status line inside the current phase.
    fn message(&self, msg: &str) -> Result<(), ProgressError>;

    fn finish(&self, msg: &str) -> Result<(), ProgressError>;

    fn finish_with_error(&self, msg: &str) -> Result<(), ProgressError>;
}
