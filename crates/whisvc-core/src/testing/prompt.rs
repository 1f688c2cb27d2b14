use std::sync::Mutex;

use crate::domain::{ModelTier, ServicePort};
use crate::ports::{OperatorPrompt, PromptError};

/// Answers prompts from fixed values. `None` means "take the default".
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    pub model: Option<ModelTier>,
    pub port: Option<ServicePort>,
    pub accept_acceleration: bool,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(model: Option<ModelTier>, port: Option<ServicePort>, accept_acceleration: bool) -> Self {
        Self {
            model,
            port,
            accept_acceleration,
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Confirmation questions asked so far.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl OperatorPrompt for ScriptedPrompt {
    fn choose_model(&self, default: ModelTier) -> Result<ModelTier, PromptError> {
        Ok(self.model.unwrap_or(default))
    }

    fn choose_port(&self, default: ServicePort) -> Result<ServicePort, PromptError> {
        Ok(self.port.unwrap_or(default))
    }

    fn confirm(&self, message: &str, _default: bool) -> Result<bool, PromptError> {
        self.questions.lock().unwrap().push(message.to_string());
        Ok(self.accept_acceleration)
    }

    fn notice(&self, _message: &str) {}
}
