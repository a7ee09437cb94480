//! In-memory key-value store
//!
//! Backs use-case tests and ephemeral runs. Entries with a TTL expire
//! relative to insertion time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use md_core::ports::KeyValueStorePort;

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the live (unexpired) entries, for test assertions.
    pub fn snapshot(&self) -> HashMap<String, String> {
        let now = Instant::now();
        self.entries
            .lock()
            .expect("store lock poisoned")
            .iter()
            .filter(|(_, (_, expires))| !matches!(expires, Some(at) if *at <= now))
            .map(|(k, (v, _))| (k.clone(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl KeyValueStorePort for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries
            .get(key)
            .filter(|(_, expires)| !matches!(expires, Some(at) if *at <= Instant::now()))
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let expires = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .remove(key);
        Ok(())
    }
}
