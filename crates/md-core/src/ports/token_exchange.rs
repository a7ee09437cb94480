//! Legacy authorization-code exchange port

use async_trait::async_trait;

use crate::errors::BackendError;

/// Tokens minted by the exchange endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[async_trait]
pub trait TokenExchangePort: Send + Sync {
    /// Trade an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenPair, BackendError>;
}
