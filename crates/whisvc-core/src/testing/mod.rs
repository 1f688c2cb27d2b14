//! In-memory implementations of the ports, for orchestration tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for dependent crates. Every fake records what was asked of it so tests can
//! assert on the sequence of OS-level operations without touching the host.

mod config;
mod fetch;
mod host;
mod process;
mod progress;
mod prompt;
mod runner;
mod service;

pub use config::MemoryConfigStore;
pub use fetch::FakeArchiveFetcher;
pub use host::StaticHostProbe;
pub use process::FakeProcessTable;
pub use progress::{ProgressEvent, RecordingProgress};
pub use prompt::ScriptedPrompt;
pub use runner::ScriptedRunner;
pub use service::{MemoryServiceManager, ServiceOp};

pub use crate::ports::process_table::MockProcessTable;
