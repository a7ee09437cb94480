//! Client-side routes and the protected-route gate.
//!
//! The gate is a pure function of `(session, loading, onboarding)`; it
//! never performs I/O and is safe to re-evaluate at any time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Landing,
    Onboarding,
    AuthCallback,
    Settings,
    Chat,
    NotFound,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Onboarding => "/onboarding",
            Route::AuthCallback => "/auth/callback",
            Route::Settings => "/settings",
            Route::Chat => "/chat",
            Route::NotFound => "*",
        }
    }

    pub fn from_path(path: &str) -> Route {
        match path {
            "/" => Route::Landing,
            "/onboarding" => Route::Onboarding,
            "/auth/callback" => Route::AuthCallback,
            "/settings" => Route::Settings,
            "/chat" => Route::Chat,
            _ => Route::NotFound,
        }
    }

    /// Whether reaching this route requires a completed onboarding flow.
    pub fn requires_onboarding(&self) -> bool {
        matches!(self, Route::Settings | Route::Chat)
    }

    /// Whether this route sits behind the gate at all.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Onboarding | Route::Settings | Route::Chat)
    }
}

/// Outcome of gating a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Bootstrap still in flight; render a placeholder.
    Loading,
    /// No session; back to the public landing route.
    RedirectToLanding,
    /// Session present but onboarding incomplete and required.
    RedirectToOnboarding,
    /// Render the protected content.
    Render,
}

/// Protected-route gate.
pub fn gate(
    has_session: bool,
    loading: bool,
    onboarding_complete: bool,
    require_onboarding: bool,
) -> GateOutcome {
    if loading {
        return GateOutcome::Loading;
    }
    if !has_session {
        return GateOutcome::RedirectToLanding;
    }
    if require_onboarding && !onboarding_complete {
        return GateOutcome::RedirectToOnboarding;
    }
    GateOutcome::Render
}
