use std::{collections::HashMap, sync::Mutex};

use anyhow::{anyhow, Result};

use super::DurableStore;

/// Keeps records in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.records.lock().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: &str, blob: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(key.into(), blob.into());
        }
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("Memory store lock is poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("Memory store lock is poisoned"))?;
        records.insert(key.into(), blob.into());
        Ok(())
    }
}
