use std::sync::Mutex;

use crate::ports::{ProgressError, ProgressSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Phase(String),
    Message(String),
    Finished(String),
    Failed(String),
}

/// Records every update; optionally rejects all of them.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
    disconnected: bool,
}

impl RecordingProgress {
    /// A sink whose every update fails, as a closed display would.
    pub fn disconnected() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            disconnected: true,
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: ProgressEvent) -> Result<(), ProgressError> {
        if self.disconnected {
            return Err(ProgressError::Disconnected);
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl ProgressSink for RecordingProgress {
    fn phase(&self, name: &str, _index: usize, _total: usize) -> Result<(), ProgressError> {
        self.record(ProgressEvent::Phase(name.to_string()))
    }

    fn message(&self, msg: &str) -> Result<(), ProgressError> {
        self.record(ProgressEvent::Message(msg.to_string()))
    }

    fn finish(&self, msg: &str) -> Result<(), ProgressError> {
        self.record(ProgressEvent::Finished(msg.to_string()))
    }

    fn finish_with_error(&self, msg: &str) -> Result<(), ProgressError> {
        self.record(ProgressEvent::Failed(msg.to_string()))
    }
}
