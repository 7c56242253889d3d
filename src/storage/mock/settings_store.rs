//! Mock SettingsStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{Result, SettingsStore, StorageError};

/// Mock settings store that stores values in memory.
#[derive(Default)]
pub struct MockSettingsStore {
    values: RwLock<HashMap<String, String>>,
    fail_on_get: RwLock<bool>,
}

impl MockSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }
}

#[async_trait]
impl SettingsStore for MockSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if *self.fail_on_get.read().await {
            return Err(StorageError::Unavailable(format!("get {key} failed")));
        }
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut values = self.values.write().await;
        if values.contains_key(key) {
            return Ok(false);
        }
        values.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}
