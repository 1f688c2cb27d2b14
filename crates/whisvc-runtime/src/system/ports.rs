//! Port occupancy classification.
//!
//! A connect to loopback tells us whether *something* is listening. Whether
//! that something is us is decided by comparing against the port recorded by
//! the previous install and asking the service manager whether that install
//! is running. This is a heuristic: another process can bind the port between
//! this check and the service starting.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use whisvc_core::settings::BIND_ADDRESS;
use whisvc_core::{ConfigStore, InstallationState, PortDisposition, ServiceManager, ServicePort};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const CONNECT_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortResolution {
    pub port: u16,
    pub disposition: PortDisposition,
    pub warning: Option<String>,
}

pub struct PortResolver {
    store: Arc<dyn ConfigStore>,
    services: Arc<dyn ServiceManager>,
    connect_timeout: Duration,
    attempts: u32,
}

impl PortResolver {
    pub fn new(store: Arc<dyn ConfigStore>, services: Arc<dyn ServiceManager>) -> Self {
        Self {
            store,
            services,
            connect_timeout: CONNECT_TIMEOUT,
            attempts: CONNECT_ATTEMPTS,
        }
    }

    pub async fn resolve(&self, port: ServicePort, service: &str) -> PortResolution {
        let requested = port.get();
        let bound = self.is_bound(requested).await;

        let previous = match InstallationState::previous_port(self.store.as_ref(), service).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Could not read previous port; treating as first install");
                None
            }
        };

        let service_active = bound && previous.is_some() && self.service_active(service).await;

        let disposition = PortDisposition::classify(bound, requested, previous, service_active);
        let warning = disposition.warning(requested);
        info!(
            port = requested,
            previous = ?previous,
            service_active,
            disposition = %disposition,
            "Port resolved"
        );

        PortResolution {
            port: requested,
            disposition,
            warning,
        }
    }

    async fn service_active(&self, service: &str) -> bool {
        match self.services.status(service).await {
            Ok(status) => status.is_active(),
            Err(e) => {
                warn!(service, error = %e, "Could not query service status; assuming it is not running");
                false
            }
        }
    }

    async fn is_bound(&self, port: u16) -> bool {
        for attempt in 1..=self.attempts {
            match timeout(self.connect_timeout, TcpStream::connect((BIND_ADDRESS, port))).await {
                Ok(Ok(_)) => return true,
                Ok(Err(e)) => debug!(port, attempt, error = %e, "Port probe refused"),
                Err(_) => debug!(port, attempt, "Port probe timed out"),
            }
        }
        false
    }
}
