//! Operator prompt abstraction.
//!
//! Install needs three operator decisions: the model tier, the port, and
//! (only on compatible hardware) whether to enable acceleration. The CLI
//! answers them on stdin; tests answer them from a script.

use thiserror::Error;

use crate::domain::{ModelTier, ServicePort};

#[derive(Debug, Error)]
pub enum PromptError {
    /// No operator is available to answer.
    #[error("Operator input required: {0}")]
    Required(String),

    #[error("Failed to read operator input: {0}")]
    Io(#[from] std::io::Error),
}

pub trait OperatorPrompt: Send + Sync {
    /// Pick one of [`ModelTier::ALL`]; `default` is taken on empty input.
    fn choose_model(&self, default: ModelTier) -> Result<ModelTier, PromptError>;

    /// Pick a port; `default` is pre-filled from any previous install.
    fn choose_port(&self, default: ServicePort) -> Result<ServicePort, PromptError>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Operator-facing notice that does not need an answer.
    fn notice(&self, message: &str);
}
