use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{ConfigError, ConfigScope, ConfigStore};

type Records = BTreeMap<(String, ConfigScope), BTreeMap<String, String>>;

/// Config store backed by a map. A cleared scope disappears entirely.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    records: Mutex<Records>,
    writes: Mutex<usize>,
}

impl MemoryConfigStore {
    pub fn snapshot(&self, service: &str, scope: ConfigScope) -> BTreeMap<String, String> {
        self.records
            .lock()
            .unwrap()
            .get(&(service.to_string(), scope))
            .cloned()
            .unwrap_or_default()
    }

    /// No scope of `service` holds any key.
    pub fn is_empty_for(&self, service: &str) -> bool {
        !self
            .records
            .lock()
            .unwrap()
            .keys()
            .any(|(name, _)| name == service)
    }

    /// Number of individual key writes so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn read(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        Ok(self.snapshot(service, scope).get(key).cloned())
    }

    async fn read_all(
        &self,
        service: &str,
        scope: ConfigScope,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(self.snapshot(service, scope))
    }

    async fn write(
        &self,
        service: &str,
        scope: ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        self.records
            .lock()
            .unwrap()
            .entry((service.to_string(), scope))
            .or_default()
            .insert(key.to_string(), value.to_string());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn clear(&self, service: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        self.records
            .lock()
            .unwrap()
            .remove(&(service.to_string(), scope));
        Ok(())
    }

    fn describe(&self, service: &str, scope: ConfigScope) -> String {
        format!("memory://{service}/{scope}")
    }
}
