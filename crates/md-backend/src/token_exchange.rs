//! Legacy authorization-code exchange
//!
//! One retained code path: a direct form-encoded POST to the external
//! token endpoint, expecting a JSON body with `access_token` and an
//! optional `refresh_token`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use md_core::ports::{TokenExchangePort, TokenPair};
use md_core::BackendError;

use crate::{error_from_response, map_transport};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

pub struct TokenExchangeClient {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
}

impl TokenExchangeClient {
    pub fn new(
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
        })
    }
}

#[async_trait]
impl TokenExchangePort for TokenExchangeClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenPair, BackendError> {
        debug!(endpoint = %self.token_endpoint, "exchanging authorization code");
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(map_transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let tokens: TokenResponse = response.json().await.map_err(map_transport)?;
        Ok(TokenPair {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }
}
