//! File-backed local key-value store
//!
//! The persistent local store counterpart to the cookie jar: a plain JSON
//! string map with no expiry. TTLs passed to `set` are ignored.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use md_core::ports::KeyValueStorePort;

pub struct FileLocalStore {
    store_path: PathBuf,
    lock: Mutex<()>,
}

impl FileLocalStore {
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            lock: Mutex::new(()),
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self::new(base_dir.join(super::DEFAULT_LOCAL_STORE_FILE))
    }

    async fn ensure_parent_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<HashMap<String, String>> {
        if !self.store_path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.store_path).await?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let map: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse local store: {}", e))?;
        Ok(map)
    }

    async fn save(&self, map: &HashMap<String, String>) -> anyhow::Result<()> {
        self.ensure_parent_dir().await?;
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| anyhow::anyhow!("Failed to serialize local store: {}", e))?;
        let mut file = fs::File::create(&self.store_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create local store: {}", e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write local store: {}", e))?;
        file.sync_all()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to sync local store: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorePort for FileLocalStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}
