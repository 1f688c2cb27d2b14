//! Live [`HostProbe`] implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use whisvc_core::{CommandRunner, HostProbe, Privilege};

/// Hosts that must be reachable for runtime and package downloads.
const CONNECTIVITY_URLS: &[&str] = &["https://pypi.org/simple/", "https://bootstrap.pypa.io/"];

pub struct SystemHostProbe {
    #[cfg_attr(unix, allow(dead_code))]
    runner: Arc<dyn CommandRunner>,
    client: Client,
}

impl SystemHostProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { runner, client }
    }
}

#[async_trait]
impl HostProbe for SystemHostProbe {
    async fn privilege(&self) -> Privilege {
        #[cfg(unix)]
        {
            if nix::unistd::geteuid().is_root() {
                Privilege::Elevated
            } else {
                Privilege::Standard
            }
        }

        #[cfg(not(unix))]
        {
            // `net session` only succeeds from an elevated token.
            let spec = whisvc_core::CommandSpec::new("net").arg("session");
            match crate::command::run_logged(self.runner.as_ref(), &spec).await {
                Ok(output) if output.success() => Privilege::Elevated,
                _ => Privilege::Standard,
            }
        }
    }

    async fn has_connectivity(&self) -> bool {
        for url in CONNECTIVITY_URLS {
            match self.client.head(*url).send().await {
                Ok(response) => {
                    debug!(url, status = %response.status(), "Connectivity probe answered");
                }
                Err(e) => {
                    debug!(url, error = %e, "Connectivity probe failed");
                    return false;
                }
            }
        }
        true
    }

    async fn media_tool(&self) -> Option<PathBuf> {
        which::which("ffmpeg").ok()
    }
}
