//! Service registration: OS adapters and the replace-whole-record provisioner.

mod provision;
mod sc;
mod systemd;

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;
use whisvc_core::ServiceManager;

pub use provision::{ServiceHandle, ServiceProvisioner, StartOutcome, TeardownOutcome};
pub use sc::{ScServiceManager, parse_binary_path, parse_sc_state};
pub use systemd::{SystemdServiceManager, render_unit};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll until `name` is no longer active or `grace` runs out.
///
/// Returns `true` once the service is stopped or gone. A status query that
/// fails counts as "not stopped yet".
pub(crate) async fn wait_until_stopped(
    services: &dyn ServiceManager,
    name: &str,
    grace: Duration,
) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        match services.status(name).await {
            Ok(status) if !status.is_active() => return true,
            Ok(status) => debug!(service = name, %status, "Waiting for service to stop"),
            Err(e) => debug!(service = name, error = %e, "Status query failed while waiting"),
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
