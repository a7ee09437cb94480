//! Key-value store port
//!
//! Abstracts the two redundant persistence stores (cookie jar and the
//! local key-value store). Both hold small string pairs that must survive
//! reloads; only the cookie store honours the optional TTL.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStorePort: Send + Sync {
    /// Read a value; expired entries read as `None`.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Write a value. `ttl` is honoured by expiring stores and ignored by
    /// the rest.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()>;

    /// Remove a value if present.
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}
