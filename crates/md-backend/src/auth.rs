//! Auth client (GoTrue dialect)
//!
//! Provider sign-in URLs, session retrieval and installation, sign-out,
//! and profile-metadata updates against `/auth/v1`. Session-change events
//! fan out on a broadcast channel for the lifetime of the process.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use md_core::ports::BackendAuthPort;
use md_core::{AuthProvider, BackendError, Session, SessionEvent, UserId, UserProfile};

use crate::{error_from_response, http_client, map_transport, BackendConfig, TokenState};

pub struct AuthClient {
    http: reqwest::Client,
    config: BackendConfig,
    tokens: Arc<TokenState>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthClient {
    pub fn new(config: BackendConfig, tokens: Arc<TokenState>) -> Result<Self, BackendError> {
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            http: http_client(&config)?,
            config,
            tokens,
            events,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.base_url)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine; the bootstrap listener attaches later.
        let _ = self.events.send(event);
    }

    /// Fetch the actor behind `access_token` and shape it into a session.
    async fn fetch_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, BackendError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let user: Value = response.json().await.map_err(map_transport)?;
        session_from_user(&user, access_token, refresh_token)
    }
}

fn session_from_user(
    user: &Value,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Result<Session, BackendError> {
    let id = user
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BackendError::Transport("user response missing id".to_string()))?;
    let profile = user
        .get("user_metadata")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    Ok(Session {
        user: UserId::from(id),
        profile: UserProfile(profile),
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
    })
}

#[async_trait]
impl BackendAuthPort for AuthClient {
    fn authorize_url(&self, provider: AuthProvider, redirect_to: &str) -> String {
        let base = self.endpoint("authorize");
        reqwest::Url::parse_with_params(
            &base,
            &[("provider", provider.slug()), ("redirect_to", redirect_to)],
        )
        .map(String::from)
        .unwrap_or_else(|_| format!("{base}?provider={}", provider.slug()))
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(access) = self.tokens.access_token() else {
            return Ok(None);
        };
        let refresh = self.tokens.refresh_token();
        match self.fetch_session(&access, refresh.as_deref()).await {
            Ok(session) => Ok(Some(session)),
            Err(err) if matches!(err, BackendError::Unauthorized(_)) => {
                debug!(error = %err, "stored token rejected, treating as signed out");
                self.tokens.clear();
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, BackendError> {
        let session = self.fetch_session(access_token, refresh_token).await?;
        self.tokens.install(access_token, refresh_token);
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let access = self.tokens.access_token();
        // Local teardown happens regardless of the backend's answer.
        self.tokens.clear();
        self.emit(SessionEvent::SignedOut);

        let Some(access) = access else {
            return Ok(());
        };
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access)
            .send()
            .await
            .map_err(map_transport)?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            warn!(error = %err, "backend logout failed after local teardown");
            return Err(err);
        }
        Ok(())
    }

    async fn update_profile(&self, changes: Value) -> Result<(), BackendError> {
        let Some(access) = self.tokens.access_token() else {
            return Err(BackendError::Unauthorized("no session".to_string()));
        };
        let response = self
            .http
            .put(self.endpoint("user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&access)
            .json(&serde_json::json!({ "data": changes }))
            .send()
            .await
            .map_err(map_transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let user: Value = response.json().await.map_err(map_transport)?;
        if let Ok(session) =
            session_from_user(&user, &access, self.tokens.refresh_token().as_deref())
        {
            self.emit(SessionEvent::TokenRefreshed(session));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_BODY: &str = r#"{
        "id": "u1",
        "user_metadata": {"name": "Ada", "onboarding_complete": true}
    }"#;

    fn client(server: &mockito::Server, tokens: Arc<TokenState>) -> AuthClient {
        AuthClient::new(BackendConfig::new(server.url(), "anon-key"), tokens).unwrap()
    }

    #[test]
    fn authorize_url_carries_provider_and_redirect() {
        let tokens = Arc::new(TokenState::default());
        let config = BackendConfig::new("https://xyz.supabase.co", "anon");
        let auth = AuthClient::new(config, tokens).unwrap();

        let url = auth.authorize_url(AuthProvider::GitHub, "https://mardev.app/auth/callback");
        assert!(url.starts_with("https://xyz.supabase.co/auth/v1/authorize?"));
        assert!(url.contains("provider=github"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fmardev.app%2Fauth%2Fcallback"));
    }

    #[tokio::test]
    async fn current_session_is_none_without_tokens() {
        let server = mockito::Server::new_async().await;
        let auth = client(&server, Arc::new(TokenState::default()));

        assert_eq!(auth.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_session_fetches_user_and_emits_signed_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer acc")
            .with_status(200)
            .with_body(USER_BODY)
            .create_async()
            .await;

        let tokens = Arc::new(TokenState::default());
        let auth = client(&server, tokens.clone());
        let mut events = auth.subscribe();

        let session = auth.set_session("acc", Some("ref")).await.unwrap();
        assert_eq!(session.user.as_str(), "u1");
        assert_eq!(session.profile.name(), Some("Ada"));
        assert_eq!(session.profile.onboarding_complete(), Some(true));
        assert_eq!(tokens.access_token(), Some("acc".to_string()));
        assert!(matches!(
            events.try_recv().unwrap(),
            SessionEvent::SignedIn(_)
        ));
    }

    #[tokio::test]
    async fn rejected_token_reads_as_signed_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .with_status(401)
            .with_body(r#"{"msg": "invalid JWT"}"#)
            .create_async()
            .await;

        let tokens = Arc::new(TokenState::default());
        tokens.install("stale", None);
        let auth = client(&server, tokens.clone());

        assert_eq!(auth.current_session().await.unwrap(), None);
        assert_eq!(tokens.access_token(), None);
    }

    #[tokio::test]
    async fn sign_out_clears_tokens_and_emits_even_on_backend_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/logout")
            .with_status(500)
            .with_body(r#"{"message": "boom"}"#)
            .create_async()
            .await;

        let tokens = Arc::new(TokenState::default());
        tokens.install("acc", None);
        let auth = client(&server, tokens.clone());
        let mut events = auth.subscribe();

        assert!(auth.sign_out().await.is_err());
        assert_eq!(tokens.access_token(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
    }

    #[tokio::test]
    async fn update_profile_puts_metadata_under_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/auth/v1/user")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "data": {"onboarding_complete": true}
            })))
            .with_status(200)
            .with_body(USER_BODY)
            .create_async()
            .await;

        let tokens = Arc::new(TokenState::default());
        tokens.install("acc", None);
        let auth = client(&server, tokens);

        auth.update_profile(serde_json::json!({"onboarding_complete": true}))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_profile_without_session_is_unauthorized() {
        let server = mockito::Server::new_async().await;
        let auth = client(&server, Arc::new(TokenState::default()));

        let err = auth
            .update_profile(serde_json::json!({"name": "Ada"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }
}
