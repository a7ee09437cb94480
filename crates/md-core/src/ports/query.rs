//! Backend row-query port
//!
//! Row select/insert/update/delete against the backend's logical tables,
//! keyed by column filters. Rows travel as JSON objects; the use cases own
//! the table schemas.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
}

/// One column filter, `column <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn neq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Neq,
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait BackendQueryPort: Send + Sync {
    /// Select `columns` (comma-separated, `*` for all) from `table`.
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Vec<Value>, BackendError>;

    async fn insert(&self, table: &str, row: Value) -> Result<(), BackendError>;

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        changes: Value,
    ) -> Result<(), BackendError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;
}
