//! Replace-whole-record service provisioning.
//!
//! A registration is never patched. `provision` confirms the old one is gone
//! (escalating from the runtime's own removal entry point to the service
//! manager to a direct purge) before creating the new one, and the
//! environment block is cleared and rewritten key by key.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use whisvc_core::{
    CommandRunner, CommandSpec, ConfigScope, ConfigStore, ElevatedToken, ServiceError,
    ServiceManager, ServiceRegistration,
};

use super::wait_until_stopped;
use crate::command::run_logged;

const STOP_GRACE: Duration = Duration::from_secs(5);

/// A freshly created registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    name: String,
}

impl ServiceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StartOutcome {
    Started,
    /// The manager refused or timed out; the automatic startup policy still
    /// applies at next boot.
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeardownOutcome {
    pub was_present: bool,
    pub was_running: bool,
    /// A direct purge was needed after normal removal left the record behind.
    pub purged: bool,
}

pub struct ServiceProvisioner {
    services: Arc<dyn ServiceManager>,
    config: Arc<dyn ConfigStore>,
    runner: Arc<dyn CommandRunner>,
    removal_command: Option<CommandSpec>,
    stop_grace: Duration,
    _elevated: ElevatedToken,
}

impl ServiceProvisioner {
    pub fn new(
        services: Arc<dyn ServiceManager>,
        config: Arc<dyn ConfigStore>,
        runner: Arc<dyn CommandRunner>,
        elevated: ElevatedToken,
    ) -> Self {
        Self {
            services,
            config,
            runner,
            removal_command: None,
            stop_grace: STOP_GRACE,
            _elevated: elevated,
        }
    }

    /// Remove existing registrations through this command first, e.g.
    /// `python whisper_service.py remove`.
    #[must_use]
    pub fn with_removal_command(mut self, command: Option<CommandSpec>) -> Self {
        self.removal_command = command;
        self
    }

    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub async fn provision(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<ServiceHandle, ServiceError> {
        let name = registration.name.as_str();

        let previous = self.teardown(name).await?;
        if previous.was_present {
            info!(service = name, "Previous registration removed");
        }

        self.services.create(registration).await?;
        self.services
            .set_description(name, &registration.description)
            .await?;
        self.services.set_startup(name, registration.startup).await?;
        info!(service = name, command = %registration.command_line(), "Service registered");

        self.config.clear(name, ConfigScope::Environment).await?;
        for (key, value) in &registration.environment {
            self.config
                .write(name, ConfigScope::Environment, key, value)
                .await?;
        }
        info!(
            service = name,
            keys = registration.environment.len(),
            location = %self.config.describe(name, ConfigScope::Environment),
            "Service environment written"
        );

        Ok(ServiceHandle {
            name: name.to_string(),
        })
    }

    pub async fn start(&self, handle: &ServiceHandle) -> StartOutcome {
        match self.services.start(&handle.name).await {
            Ok(()) => {
                info!(service = %handle.name, "Service started");
                StartOutcome::Started
            }
            Err(e) => {
                warn!(service = %handle.name, error = %e, "Service did not start; it will start on next boot");
                StartOutcome::Failed(e.to_string())
            }
        }
    }

    /// Stop the service if it is active. Returns whether it was.
    pub async fn stop(&self, name: &str) -> Result<bool, ServiceError> {
        let status = self.services.status(name).await?;
        if !status.is_active() {
            return Ok(false);
        }

        info!(service = name, %status, "Stopping service");
        if let Err(e) = self.services.stop(name).await {
            warn!(service = name, error = %e, "Stop request failed");
        }
        if !wait_until_stopped(self.services.as_ref(), name, self.stop_grace).await {
            warn!(
                service = name,
                seconds = self.stop_grace.as_secs(),
                "Service still active after grace period"
            );
        }
        Ok(true)
    }

    /// Stop and remove `name`, confirming it is absent afterwards.
    pub async fn teardown(&self, name: &str) -> Result<TeardownOutcome, ServiceError> {
        let mut outcome = TeardownOutcome::default();
        if !self.services.status(name).await?.is_present() {
            return Ok(outcome);
        }
        outcome.was_present = true;
        outcome.was_running = self.stop(name).await?;

        if let Some(command) = &self.removal_command {
            match run_logged(self.runner.as_ref(), command).await {
                Ok(out) if out.success() => {}
                Ok(out) => warn!(service = name, detail = %out.detail(), "Entry point removal failed"),
                Err(e) => warn!(service = name, error = %e, "Entry point removal could not run"),
            }
        }
        if self.services.status(name).await?.is_present() {
            if let Err(e) = self.services.remove(name).await {
                warn!(service = name, error = %e, "Service manager removal failed");
            }
        }
        if self.services.status(name).await?.is_present() {
            warn!(service = name, "Registration survived removal; purging it directly");
            self.services.purge(name).await?;
            outcome.purged = true;
        }
        if self.services.status(name).await?.is_present() {
            return Err(ServiceError::StillPresent {
                name: name.to_string(),
            });
        }
        Ok(outcome)
    }
}
