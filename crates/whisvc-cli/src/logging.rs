//! Tracing subscriber setup.
//!
//! The console layer honours `RUST_LOG` and `-v`. Flows that mutate the host
//! also get a file layer writing every record, without colour codes, to the
//! run's [`InstallLog`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use whisvc_runtime::InstallLog;

/// Directive used when `RUST_LOG` is unset.
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose { "whisvc=debug" } else { "whisvc=info" }
}

/// The install log keeps command output, which is logged at debug.
const FILE_DIRECTIVE: &str = "whisvc=debug,warn";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(verbose: bool, install_log: Option<&InstallLog>) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = install_log.map(|log| {
        tracing_subscriber::fmt::layer()
            .with_writer(log.clone())
            .with_ansi(false)
            .with_target(true)
            .with_filter(EnvFilter::new(FILE_DIRECTIVE))
    });

    if tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        if let Some(log) = install_log {
            tracing::debug!(
                flow = log.flow(),
                primary = %log.locations().primary.display(),
                "Logging initialized with install log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_console_level() {
        assert_eq!(default_directive(false), "whisvc=info");
        assert_eq!(default_directive(true), "whisvc=debug");
    }

    #[test]
    fn file_layer_receives_records() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = InstallLog::create_in(temp.path(), "install").unwrap();
        init_logging(false, Some(&log));

        tracing::info!(target: "whisvc_cli::tests", "hello from the test");

        let text = std::fs::read_to_string(log.locations().primary).unwrap();
        assert!(text.contains("hello from the test"));
        assert!(!text.contains('\u{1b}'));
    }
}
