//! Port definitions (trait abstractions) for the operating system.
//!
//! Ports define the interfaces the install and uninstall flows expect from
//! the host. They carry only domain types; implementations live in
//! `whisvc-runtime`, and in-memory fakes live in [`crate::testing`].
//!
//! # Design Rules
//!
//! - No process, registry, or socket details in any signature
//! - Every fallible method returns the port's own error type
//! - Service and config operations are keyed by service name, never by handle

pub mod archive_fetcher;
pub mod command_runner;
pub mod config_store;
pub mod host_probe;
pub mod process_table;
pub mod progress;
pub mod prompt;
pub mod service_manager;

pub use archive_fetcher::{ArchiveFetcher, FetchError};
pub use command_runner::{CommandError, CommandOutput, CommandRunner, CommandSpec};
pub use config_store::{ConfigError, ConfigScope, ConfigStore};
pub use host_probe::HostProbe;
pub use process_table::{ProcessInfo, ProcessTable, processes_under};
pub use progress::{ProgressError, ProgressSink};
pub use prompt::{OperatorPrompt, PromptError};
pub use service_manager::{ServiceError, ServiceManager};
