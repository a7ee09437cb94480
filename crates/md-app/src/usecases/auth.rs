//! Sign-in, sign-out, session refresh, and the legacy OAuth callback.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use md_core::keys;
use md_core::ports::{BackendAuthPort, KeyValueStorePort, NavigatorPort, TokenExchangePort};
use md_core::{AuthProvider, Route};

use crate::context::AuthContext;

/// Cookie lifetimes written by the legacy callback.
const AUTH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Deadline on the code-for-token exchange.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq)]
pub enum SignInError {
    #[error("Cannot sign in while offline")]
    Offline,
}

/// Produce the provider authorize URL; actually visiting it is the
/// caller's concern.
pub struct SignIn {
    ctx: Arc<AuthContext>,
    auth: Arc<dyn BackendAuthPort>,
}

impl SignIn {
    pub fn new(ctx: Arc<AuthContext>, auth: Arc<dyn BackendAuthPort>) -> Self {
        Self { ctx, auth }
    }

    pub fn execute(&self, provider: AuthProvider, redirect_to: &str) -> Result<String, SignInError> {
        if self.ctx.is_offline() {
            return Err(SignInError::Offline);
        }
        let url = self.auth.authorize_url(provider, redirect_to);
        info!(provider = provider.slug(), "starting provider sign-in");
        Ok(url)
    }
}

/// Backend sign-out when reachable, local teardown always, landing route
/// either way.
pub struct SignOut {
    ctx: Arc<AuthContext>,
    auth: Arc<dyn BackendAuthPort>,
    navigator: Arc<dyn NavigatorPort>,
}

impl SignOut {
    pub fn new(
        ctx: Arc<AuthContext>,
        auth: Arc<dyn BackendAuthPort>,
        navigator: Arc<dyn NavigatorPort>,
    ) -> Self {
        Self { ctx, auth, navigator }
    }

    pub async fn execute(&self) {
        if !self.ctx.is_offline() {
            if let Err(err) = self.auth.sign_out().await {
                warn!(error = %err, "backend sign-out failed, tearing down locally");
            }
        }
        self.ctx.teardown();
        self.navigator.replace(Route::Landing);
    }
}

/// Re-fetch the current session into the context. No-op offline.
pub struct RefreshSession {
    ctx: Arc<AuthContext>,
    auth: Arc<dyn BackendAuthPort>,
}

impl RefreshSession {
    pub fn new(ctx: Arc<AuthContext>, auth: Arc<dyn BackendAuthPort>) -> Self {
        Self { ctx, auth }
    }

    pub async fn execute(&self) {
        if self.ctx.is_offline() {
            return;
        }
        match self.auth.current_session().await {
            Ok(session) => self.ctx.set_session(session),
            Err(err) => warn!(error = %err, "session refresh failed"),
        }
    }
}

/// Query parameters delivered to the OAuth callback route.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Terminal verdict of the callback flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Success,
    Failed { message: String },
}

impl ExchangeOutcome {
    fn failed(message: impl Into<String>) -> Self {
        ExchangeOutcome::Failed {
            message: message.into(),
        }
    }
}

/// Legacy callback: trade the authorization code for tokens, persist the
/// token cookies, and install the session. Always reaches a terminal
/// outcome within the exchange deadline.
pub struct ExchangeAuthCode {
    ctx: Arc<AuthContext>,
    auth: Arc<dyn BackendAuthPort>,
    exchange: Arc<dyn TokenExchangePort>,
    cookies: Arc<dyn KeyValueStorePort>,
    redirect_uri: String,
    timeout: Duration,
}

impl ExchangeAuthCode {
    pub fn new(
        ctx: Arc<AuthContext>,
        auth: Arc<dyn BackendAuthPort>,
        exchange: Arc<dyn TokenExchangePort>,
        cookies: Arc<dyn KeyValueStorePort>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            auth,
            exchange,
            cookies,
            redirect_uri: redirect_uri.into(),
            timeout: EXCHANGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(&self, params: &CallbackParams) -> ExchangeOutcome {
        if let Some(error) = &params.error {
            let message = params
                .error_description
                .clone()
                .unwrap_or_else(|| error.clone());
            warn!(error, "provider returned an error to the callback");
            return ExchangeOutcome::failed(message);
        }
        let code = match &params.code {
            Some(code) if !code.is_empty() => code,
            _ => return ExchangeOutcome::failed("Missing authorization code"),
        };

        let exchange = self.exchange.exchange_code(code, &self.redirect_uri);
        let tokens = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(tokens)) => tokens,
            Ok(Err(err)) => {
                warn!(error = %err, "code exchange failed");
                return ExchangeOutcome::failed("Authentication failed. Please try again.");
            }
            Err(_) => {
                warn!("code exchange timed out");
                return ExchangeOutcome::failed("Authentication timed out. Please try again.");
            }
        };

        if let Err(err) = self
            .cookies
            .set(keys::AUTH_TOKEN, &tokens.access_token, Some(AUTH_TOKEN_TTL))
            .await
        {
            warn!(error = %err, "auth token cookie write failed");
        }
        if let Some(refresh) = &tokens.refresh_token {
            if let Err(err) = self
                .cookies
                .set(keys::REFRESH_TOKEN, refresh, Some(REFRESH_TOKEN_TTL))
                .await
            {
                warn!(error = %err, "refresh token cookie write failed");
            }
        }

        match self
            .auth
            .set_session(&tokens.access_token, tokens.refresh_token.as_deref())
            .await
        {
            Ok(session) => {
                self.ctx.set_session(Some(session));
                info!("legacy callback signed the actor in");
                ExchangeOutcome::Success
            }
            Err(err) => {
                warn!(error = %err, "session install failed after exchange");
                ExchangeOutcome::failed("Authentication failed. Please try again.")
            }
        }
    }
}
