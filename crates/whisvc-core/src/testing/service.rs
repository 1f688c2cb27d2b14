use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{ServiceRegistration, ServiceStatus, StartupType};
use crate::ports::{ServiceError, ServiceManager};

/// Operation recorded by [`MemoryServiceManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceOp {
    Stop(String),
    Start(String),
    Create(String),
    SetDescription(String),
    SetStartup(String, StartupType),
    Remove(String),
    Purge(String),
}

#[derive(Debug, Default)]
struct Inner {
    services: BTreeMap<String, (ServiceRegistration, ServiceStatus)>,
    ops: Vec<ServiceOp>,
}

/// Service database held in memory.
///
/// `create` refuses a name that already exists, so a test fails loudly if a
/// caller ever tries to register over a live record.
#[derive(Debug, Default)]
pub struct MemoryServiceManager {
    inner: Mutex<Inner>,
    fail_start: bool,
    sticky_remove: bool,
}

impl MemoryServiceManager {
    /// `start` fails with a manager error.
    #[must_use]
    pub const fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// `remove` reports success but leaves the record in place, as a
    /// service wrapper that cannot delete its own registration would.
    #[must_use]
    pub const fn sticky_remove(mut self) -> Self {
        self.sticky_remove = true;
        self
    }

    #[must_use]
    pub fn with_service(self, registration: ServiceRegistration, status: ServiceStatus) -> Self {
        self.inner
            .lock()
            .unwrap()
            .services
            .insert(registration.name.clone(), (registration, status));
        self
    }

    pub fn ops(&self) -> Vec<ServiceOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn registration(&self, name: &str) -> Option<ServiceRegistration> {
        self.inner
            .lock()
            .unwrap()
            .services
            .get(name)
            .map(|(r, _)| r.clone())
    }

    fn record(&self, op: ServiceOp) {
        self.inner.lock().unwrap().ops.push(op);
    }

    fn set_status(&self, name: &str, status: ServiceStatus) {
        if let Some(entry) = self.inner.lock().unwrap().services.get_mut(name) {
            entry.1 = status;
        }
    }
}

#[async_trait]
impl ServiceManager for MemoryServiceManager {
    async fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .services
            .get(name)
            .map_or(ServiceStatus::NotInstalled, |(_, s)| s.clone()))
    }

    async fn stop(&self, name: &str) -> Result<(), ServiceError> {
        self.record(ServiceOp::Stop(name.to_string()));
        self.set_status(name, ServiceStatus::Stopped);
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), ServiceError> {
        self.record(ServiceOp::Start(name.to_string()));
        if self.fail_start {
            return Err(ServiceError::failed("start", name, "service did not respond"));
        }
        self.set_status(name, ServiceStatus::Running);
        Ok(())
    }

    async fn create(&self, registration: &ServiceRegistration) -> Result<(), ServiceError> {
        self.record(ServiceOp::Create(registration.name.clone()));
        let mut inner = self.inner.lock().unwrap();
        if inner.services.contains_key(&registration.name) {
            return Err(ServiceError::failed(
                "create",
                &registration.name,
                "the specified service already exists",
            ));
        }
        inner.services.insert(
            registration.name.clone(),
            (registration.clone(), ServiceStatus::Stopped),
        );
        Ok(())
    }

    async fn set_description(&self, name: &str, description: &str) -> Result<(), ServiceError> {
        self.record(ServiceOp::SetDescription(name.to_string()));
        if let Some(entry) = self.inner.lock().unwrap().services.get_mut(name) {
            entry.0.description = description.to_string();
        }
        Ok(())
    }

    async fn set_startup(&self, name: &str, startup: StartupType) -> Result<(), ServiceError> {
        self.record(ServiceOp::SetStartup(name.to_string(), startup));
        if let Some(entry) = self.inner.lock().unwrap().services.get_mut(name) {
            entry.0.startup = startup;
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ServiceError> {
        self.record(ServiceOp::Remove(name.to_string()));
        if !self.sticky_remove {
            self.inner.lock().unwrap().services.remove(name);
        }
        Ok(())
    }

    async fn purge(&self, name: &str) -> Result<(), ServiceError> {
        self.record(ServiceOp::Purge(name.to_string()));
        self.inner.lock().unwrap().services.remove(name);
        Ok(())
    }

    async fn configured_binary(&self, name: &str) -> Result<Option<PathBuf>, ServiceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .services
            .get(name)
            .map(|(r, _)| r.binary_path.clone()))
    }

    fn log_paths(&self, _name: &str, install_path: &Path) -> Vec<PathBuf> {
        vec![
            install_path.join("logs").join("stdout.log"),
            install_path.join("logs").join("stderr.log"),
        ]
    }
}
