//! Row-query client (PostgREST dialect)
//!
//! Select/insert/update/delete against `/rest/v1/{table}`, with filters
//! encoded as `column=op.value` query parameters. Non-2xx responses carry
//! a JSON `{code, message}` body that maps straight onto the error
//! taxonomy, so callers can classify connectivity failures, missing rows,
//! and missing tables.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use md_core::ports::{BackendQueryPort, Filter, FilterOp};
use md_core::BackendError;

use crate::{error_from_response, http_client, map_transport, BackendConfig, TokenState};

pub struct RestClient {
    http: reqwest::Client,
    config: BackendConfig,
    tokens: Arc<TokenState>,
}

impl RestClient {
    pub fn new(config: BackendConfig, tokens: Arc<TokenState>) -> Result<Self, BackendError> {
        Ok(Self {
            http: http_client(&config)?,
            config,
            tokens,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.base_url)
    }

    fn bearer(&self) -> String {
        self.tokens
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn apply_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|f| {
                let op = match f.op {
                    FilterOp::Eq => "eq",
                    FilterOp::Neq => "neq",
                };
                (f.column.clone(), format!("{op}.{}", f.value))
            })
            .collect()
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), BackendError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl BackendQueryPort for RestClient {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Vec<Value>, BackendError> {
        let mut params = vec![("select".to_string(), columns.to_string())];
        params.extend(Self::filter_params(filters));
        if let Some(limit) = limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        debug!(table, columns, ?limit, "selecting rows");
        let response = self
            .apply_headers(self.http.get(self.table_url(table)))
            .query(&params)
            .send()
            .await
            .map_err(map_transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json().await.map_err(map_transport)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), BackendError> {
        debug!(table, "inserting row");
        let response = self
            .apply_headers(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(map_transport)?;
        Self::expect_success(response).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        changes: Value,
    ) -> Result<(), BackendError> {
        debug!(table, "updating rows");
        let response = self
            .apply_headers(self.http.patch(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .query(&Self::filter_params(filters))
            .json(&changes)
            .send()
            .await
            .map_err(map_transport)?;
        Self::expect_success(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        debug!(table, "deleting rows");
        let response = self
            .apply_headers(self.http.delete(self.table_url(table)))
            .query(&Self::filter_params(filters))
            .send()
            .await
            .map_err(map_transport)?;
        Self::expect_success(response).await
    }
}
