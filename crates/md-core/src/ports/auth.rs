//! Backend auth port
//!
//! Sign-in with an external provider, session retrieval and installation,
//! sign-out, profile metadata updates, and a subscription fired on any
//! session change.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::BackendError;
use crate::session::{AuthProvider, Session, SessionEvent};

#[async_trait]
pub trait BackendAuthPort: Send + Sync {
    /// The URL the user agent must visit to start the provider sign-in.
    fn authorize_url(&self, provider: AuthProvider, redirect_to: &str) -> String;

    /// Fetch the current session, `None` when nobody is signed in.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    /// Install a session from externally obtained tokens.
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Merge `changes` into the actor's profile metadata.
    async fn update_profile(&self, changes: serde_json::Value) -> Result<(), BackendError>;

    /// Session-change notifications for the lifetime of the process.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
