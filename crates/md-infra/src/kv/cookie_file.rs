//! File-backed cookie jar
//!
//! Persists cookie records to a local JSON file in the application data
//! directory. Writes carry `path=/` and `SameSite=Strict`; entries with a
//! TTL expire on read, expired entries are dropped the next time the jar
//! is rewritten.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use md_core::ports::{ClockPort, KeyValueStorePort};

use crate::time::SystemClock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CookieRecord {
    value: String,
    expires_at: Option<DateTime<Utc>>,
    path: String,
    same_site: String,
}

impl CookieRecord {
    fn new(value: &str, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| {
                now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero())
            }),
            path: "/".to_string(),
            same_site: "Strict".to_string(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

pub struct FileCookieStore {
    jar_path: PathBuf,
    clock: Arc<dyn ClockPort>,
    // Serializes read-modify-write cycles against the jar file.
    lock: Mutex<()>,
}

impl FileCookieStore {
    pub fn new(jar_path: PathBuf) -> Self {
        Self::with_clock(jar_path, Arc::new(SystemClock))
    }

    pub fn with_clock(jar_path: PathBuf, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            jar_path,
            clock,
            lock: Mutex::new(()),
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self::new(base_dir.join(super::DEFAULT_COOKIE_FILE))
    }

    async fn ensure_parent_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.jar_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<HashMap<String, CookieRecord>> {
        if !self.jar_path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.jar_path).await?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let jar: HashMap<String, CookieRecord> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse cookie jar: {}", e))?;
        Ok(jar)
    }

    async fn save(&self, jar: &HashMap<String, CookieRecord>) -> anyhow::Result<()> {
        self.ensure_parent_dir().await?;
        let json = serde_json::to_string_pretty(jar)
            .map_err(|e| anyhow::anyhow!("Failed to serialize cookie jar: {}", e))?;
        let mut file = fs::File::create(&self.jar_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create cookie jar: {}", e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write cookie jar: {}", e))?;
        file.sync_all()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to sync cookie jar: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorePort for FileCookieStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let jar = self.load().await?;
        let now = self.clock.now_utc();
        Ok(jar
            .get(key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut jar = self.load().await?;
        let now = self.clock.now_utc();
        jar.retain(|_, record| !record.is_expired(now));
        jar.insert(key.to_string(), CookieRecord::new(value, ttl, now));
        self.save(&jar).await
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut jar = self.load().await?;
        if jar.remove(key).is_some() {
            self.save(&jar).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn get_returns_none_when_jar_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCookieStore::new(temp_dir.path().join("nonexistent.json"));

        assert_eq!(store.get("mardev_username").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCookieStore::with_base_dir(temp_dir.path().to_path_buf());

        store.set("mardev_username", "ada-l", None).await.unwrap();

        assert_eq!(
            store.get("mardev_username").await.unwrap(),
            Some("ada-l".to_string())
        );
    }

    #[tokio::test]
    async fn values_survive_a_new_store_over_the_same_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jar.json");

        let store = FileCookieStore::new(path.clone());
        store
            .set("mardev_onboarding_complete", "true", None)
            .await
            .unwrap();
        drop(store);

        let reopened = FileCookieStore::new(path);
        assert_eq!(
            reopened.get("mardev_onboarding_complete").await.unwrap(),
            Some("true".to_string())
        );
    }

    #[tokio::test]
    async fn expired_entries_read_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCookieStore::with_base_dir(temp_dir.path().to_path_buf());

        store
            .set("mardev_auth", "tok", Some(Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(store.get("mardev_auth").await.unwrap(), None);
    }

    #[tokio::test]
    async fn records_carry_cookie_attributes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jar.json");
        let store = FileCookieStore::new(path.clone());

        store
            .set("mardev_username", "ada-l", Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let jar: HashMap<String, CookieRecord> = serde_json::from_str(&raw).unwrap();
        let record = &jar["mardev_username"];
        assert_eq!(record.path, "/");
        assert_eq!(record.same_site, "Strict");
        assert!(record.expires_at.is_some());
    }

    struct SteppableClock(std::sync::Mutex<DateTime<Utc>>);

    impl SteppableClock {
        fn advance(&self, by: chrono::Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl ClockPort for SteppableClock {
        fn now_utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn entries_expire_when_the_clock_passes_the_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(SteppableClock(std::sync::Mutex::new(Utc::now())));
        let store =
            FileCookieStore::with_clock(temp_dir.path().join("jar.json"), clock.clone());

        store
            .set("mardev_auth", "tok", Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert_eq!(store.get("mardev_auth").await.unwrap(), Some("tok".into()));

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(store.get("mardev_auth").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_deletes_the_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCookieStore::with_base_dir(temp_dir.path().to_path_buf());

        store.set("mardev_user_name", "Ada", None).await.unwrap();
        store.remove("mardev_user_name").await.unwrap();

        assert_eq!(store.get("mardev_user_name").await.unwrap(), None);
    }
}
