//! Session domain models
//!
//! A [`Session`] is the opaque credential bundle representing an
//! authenticated actor. It is created by a successful sign-in exchange,
//! destroyed by sign-out or expiry, and owned exclusively by the
//! application context; everything else reads it through shared references.

use serde::{Deserialize, Serialize};

/// Actor identifier assigned by the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Profile metadata attached to the actor by the backend.
///
/// The backend stores this as a free-form JSON object; typed accessors are
/// provided for the keys this client reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub serde_json::Map<String, serde_json::Value>);

impl UserProfile {
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(|v| v.as_str())
    }

    pub fn marmail_email(&self) -> Option<&str> {
        self.0.get("marmail_email").and_then(|v| v.as_str())
    }

    /// The `onboarding_complete` metadata flag, absent keys read as `None`.
    pub fn onboarding_complete(&self) -> Option<bool> {
        self.0.get("onboarding_complete").and_then(|v| v.as_bool())
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.0.insert(key.to_string(), value);
    }
}

/// Opaque credential bundle for an authenticated actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserId,
    pub profile: UserProfile,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// External identity providers supported by the sign-in exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
    GitHub,
    Discord,
}

impl AuthProvider {
    /// Provider slug as the backend auth endpoint expects it.
    pub fn slug(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::GitHub => "github",
            AuthProvider::Discord => "discord",
        }
    }
}

/// Session-change notifications fired by the backend auth interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}
