//! Infrastructure adapters for the MarDev client: file-backed cookie jar
//! and local key-value store, an in-memory store for tests and ephemeral
//! runs, the system clock, a tracing navigator, and configuration loading.

pub mod config;
pub mod kv;
pub mod navigator;
pub mod time;

pub use config::AppConfig;
pub use kv::{FileCookieStore, FileLocalStore, MemoryKeyValueStore};
pub use navigator::TracingNavigator;
pub use time::SystemClock;
