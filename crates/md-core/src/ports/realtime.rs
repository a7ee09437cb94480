//! Realtime change-feed port
//!
//! Row-insert notifications scoped to a table and optional row filter.
//! Dropping the subscription unsubscribes; in-flight notifications are
//! discarded.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::BackendError;
use crate::ports::query::Filter;

/// Live subscription to a table's insert feed.
pub struct RealtimeSubscription {
    pub rows: mpsc::Receiver<Value>,
    handle: Option<JoinHandle<()>>,
}

impl RealtimeSubscription {
    pub fn new(rows: mpsc::Receiver<Value>, handle: JoinHandle<()>) -> Self {
        Self {
            rows,
            handle: Some(handle),
        }
    }

    /// Subscription backed by a bare channel, for tests and offline runs.
    pub fn detached(rows: mpsc::Receiver<Value>) -> Self {
        Self { rows, handle: None }
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
pub trait RealtimeFeedPort: Send + Sync {
    /// Subscribe to inserts on `table`, optionally filtered by one column.
    async fn subscribe_inserts(
        &self,
        table: &str,
        filter: Option<Filter>,
    ) -> Result<RealtimeSubscription, BackendError>;
}
