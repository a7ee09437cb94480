//! Hosted-backend client adapters: row queries (PostgREST dialect), auth
//! endpoints (GoTrue dialect), the legacy OAuth token exchange, and the
//! realtime change feed over websocket.

pub mod auth;
pub mod realtime;
pub mod rest;
pub mod token_exchange;

use std::sync::RwLock;
use std::time::Duration;

use md_core::BackendError;

pub use auth::AuthClient;
pub use realtime::RealtimeClient;
pub use rest::RestClient;
pub use token_exchange::TokenExchangeClient;

/// Connection settings shared by every backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Public API key sent as the `apikey` header.
    pub anon_key: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Access/refresh tokens shared between the auth client (writer) and the
/// query clients (readers). Absent tokens fall back to the anon key.
#[derive(Default)]
pub struct TokenState {
    access: RwLock<Option<String>>,
    refresh: RwLock<Option<String>>,
}

impl TokenState {
    pub fn access_token(&self) -> Option<String> {
        self.access.read().expect("token lock poisoned").clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.refresh.read().expect("token lock poisoned").clone()
    }

    pub fn install(&self, access: &str, refresh: Option<&str>) {
        *self.access.write().expect("token lock poisoned") = Some(access.to_string());
        *self.refresh.write().expect("token lock poisoned") = refresh.map(str::to_string);
    }

    pub fn clear(&self) {
        *self.access.write().expect("token lock poisoned") = None;
        *self.refresh.write().expect("token lock poisoned") = None;
    }
}

pub(crate) fn http_client(config: &BackendConfig) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest transport failure onto the error taxonomy.
pub(crate) fn map_transport(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(err.to_string())
    }
}

/// Map a non-2xx response onto the error taxonomy. PostgREST and GoTrue
/// both answer with a JSON body carrying `code` and `message`/`msg`.
pub(crate) async fn error_from_response(response: reqwest::Response) -> BackendError {
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body
        .get("message")
        .or_else(|| body.get("msg"))
        .and_then(|v| v.as_str())
        .unwrap_or("no error body")
        .to_string();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return BackendError::Unauthorized(message);
    }
    let code = body
        .get("code")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string());
    BackendError::api(code, message)
}
