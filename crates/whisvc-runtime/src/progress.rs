//! Progress display for the install and uninstall flows.
//!
//! [`TerminalProgress`] renders on its own thread and is fed through a
//! channel, so a slow or dead terminal never stalls the flow.
//! [`ProgressHandle`] is what the flows hold: an optional sink whose failures
//! are logged and otherwise ignored.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use whisvc_core::{ProgressError, ProgressSink};

enum Update {
    Phase {
        name: String,
        index: usize,
        total: usize,
    },
    Message(String),
    Finish(String),
    Fail(String),
}

/// Spinner-style progress on stderr, rendered by a background thread.
pub struct TerminalProgress {
    tx: Mutex<Option<Sender<Update>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalProgress {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Update>();
        let worker = thread::spawn(move || {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(120));

            for update in rx {
                match update {
                    Update::Phase { name, index, total } => {
                        bar.set_prefix(format!("[{}/{}]", index + 1, total));
                        bar.set_message(name);
                    }
                    Update::Message(msg) => bar.set_message(msg),
                    Update::Finish(msg) => {
                        bar.finish_with_message(msg);
                        return;
                    }
                    Update::Fail(msg) => {
                        bar.abandon_with_message(msg);
                        return;
                    }
                }
            }
            bar.finish_and_clear();
        });

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    fn send(&self, update: Update) -> Result<(), ProgressError> {
        let guard = self.tx.lock().map_err(|_| ProgressError::Disconnected)?;
        let tx = guard.as_ref().ok_or(ProgressError::Disconnected)?;
        tx.send(update).map_err(|_| ProgressError::Disconnected)
    }

    fn close(&self, update: Update) -> Result<(), ProgressError> {
        let result = self.send(update);
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        if let Ok(mut worker) = self.worker.lock()
            && let Some(handle) = worker.take()
        {
            let _ = handle.join();
        }
        result
    }
}

impl ProgressSink for TerminalProgress {
    fn phase(&self, name: &str, index: usize, total: usize) -> Result<(), ProgressError> {
        self.send(Update::Phase {
            name: name.to_string(),
            index,
            total,
        })
    }

    fn message(&self, msg: &str) -> Result<(), ProgressError> {
        self.send(Update::Message(msg.to_string()))
    }

    fn finish(&self, msg: &str) -> Result<(), ProgressError> {
        self.close(Update::Finish(msg.to_string()))
    }

    fn finish_with_error(&self, msg: &str) -> Result<(), ProgressError> {
        self.close(Update::Fail(msg.to_string()))
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
    }
}

/// Optional progress sink that never fails the caller.
#[derive(Clone, Default)]
pub struct ProgressHandle {
    sink: Option<Arc<dyn ProgressSink>>,
}

impl ProgressHandle {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub const fn none() -> Self {
        Self { sink: None }
    }

    pub fn phase(&self, name: &str, index: usize, total: usize) {
        self.forward(|s| s.phase(name, index, total));
    }

    pub fn message(&self, msg: &str) {
        self.forward(|s| s.message(msg));
    }

    pub fn finish(&self, msg: &str) {
        self.forward(|s| s.finish(msg));
    }

    pub fn finish_with_error(&self, msg: &str) {
        self.forward(|s| s.finish_with_error(msg));
    }

    fn forward<F>(&self, update: F)
    where
        F: FnOnce(&dyn ProgressSink) -> Result<(), ProgressError>,
    {
        if let Some(sink) = &self.sink
            && let Err(e) = update(sink.as_ref())
        {
            warn!(error = %e, "Progress update dropped");
        }
    }
}

impl std::fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}
