//! Write outbox
//!
//! Best-effort backend writes queued behind the user-visible flow. The
//! original fire-and-forget calls are formalised as queued operations so
//! dropped writes are observable and retried once; failures never reach
//! the submit paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use md_core::ports::{BackendAuthPort, BackendQueryPort, Filter};
use md_core::BackendError;

const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Hard ceiling on a single delivery attempt; a hung backend call counts
/// as a timeout and goes through the normal retry path.
pub const OP_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub enum OutboxOp {
    UpdateProfile {
        changes: serde_json::Value,
    },
    InsertRow {
        table: String,
        row: serde_json::Value,
    },
    /// Insert that falls back to an update when the row already exists,
    /// so resubmissions land on the existing row.
    UpsertRow {
        table: String,
        key: Filter,
        row: serde_json::Value,
    },
    UpdateRow {
        table: String,
        filters: Vec<Filter>,
        changes: serde_json::Value,
    },
    DeleteRow {
        table: String,
        filters: Vec<Filter>,
    },
}

impl OutboxOp {
    fn describe(&self) -> String {
        match self {
            OutboxOp::UpdateProfile { .. } => "update profile metadata".to_string(),
            OutboxOp::InsertRow { table, .. } => format!("insert into {table}"),
            OutboxOp::UpsertRow { table, .. } => format!("upsert into {table}"),
            OutboxOp::UpdateRow { table, .. } => format!("update {table}"),
            OutboxOp::DeleteRow { table, .. } => format!("delete from {table}"),
        }
    }
}

pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboxOp>,
    delivered: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    worker: JoinHandle<()>,
}

impl Outbox {
    pub fn spawn(auth: Arc<dyn BackendAuthPort>, query: Arc<dyn BackendQueryPort>) -> Self {
        Self::with_op_deadline(auth, query, OP_DEADLINE)
    }

    pub fn with_op_deadline(
        auth: Arc<dyn BackendAuthPort>,
        query: Arc<dyn BackendQueryPort>,
        op_deadline: Duration,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboxOp>();
        let delivered = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));

        let delivered_w = delivered.clone();
        let dropped_w = dropped.clone();
        let worker = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match Self::attempt(&auth, &query, &op, op_deadline).await {
                    Ok(()) => {
                        delivered_w.fetch_add(1, Ordering::SeqCst);
                        debug!(op = %op.describe(), "outbox op delivered");
                    }
                    Err(first) => {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                        match Self::attempt(&auth, &query, &op, op_deadline).await {
                            Ok(()) => {
                                delivered_w.fetch_add(1, Ordering::SeqCst);
                                debug!(op = %op.describe(), "outbox op delivered on retry");
                            }
                            Err(second) => {
                                dropped_w.fetch_add(1, Ordering::SeqCst);
                                warn!(
                                    op = %op.describe(),
                                    %first,
                                    %second,
                                    "outbox op dropped after retry"
                                );
                            }
                        }
                    }
                }
            }
        });

        Self {
            tx,
            delivered,
            dropped,
            worker,
        }
    }

    async fn attempt(
        auth: &Arc<dyn BackendAuthPort>,
        query: &Arc<dyn BackendQueryPort>,
        op: &OutboxOp,
        op_deadline: Duration,
    ) -> Result<(), BackendError> {
        tokio::time::timeout(op_deadline, Self::execute(auth, query, op))
            .await
            .unwrap_or(Err(BackendError::Timeout))
    }

    async fn execute(
        auth: &Arc<dyn BackendAuthPort>,
        query: &Arc<dyn BackendQueryPort>,
        op: &OutboxOp,
    ) -> Result<(), BackendError> {
        match op {
            OutboxOp::UpdateProfile { changes } => auth.update_profile(changes.clone()).await,
            OutboxOp::InsertRow { table, row } => query.insert(table, row.clone()).await,
            OutboxOp::UpsertRow { table, key, row } => {
                match query.insert(table, row.clone()).await {
                    Err(err) if err.is_conflict() => {
                        let filters = [key.clone()];
                        query.update(table, &filters, row.clone()).await
                    }
                    result => result,
                }
            }
            OutboxOp::UpdateRow {
                table,
                filters,
                changes,
            } => query.update(table, filters, changes.clone()).await,
            OutboxOp::DeleteRow { table, filters } => query.delete(table, filters).await,
        }
    }

    /// Queue an operation. Never blocks and never fails the caller; a
    /// closed worker only means the op is dropped and counted.
    pub fn enqueue(&self, op: OutboxOp) {
        if self.tx.send(op).is_err() {
            self.dropped.fetch_add(1, Ordering::SeqCst);
            warn!("outbox worker gone, op dropped");
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
