//! Protected-route gate use case
//!
//! Thin wrapper reading the shared context and delegating to the pure gate
//! function in `md-core`. Settings and chat require a completed onboarding
//! flow; the onboarding route itself only requires a session.

use std::sync::Arc;

use tracing::debug;

use md_core::{gate, GateOutcome, Route};

use crate::context::AuthContext;

pub struct RouteGate {
    ctx: Arc<AuthContext>,
}

impl RouteGate {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        Self { ctx }
    }

    /// Gate `route` against the current context. Unprotected routes always
    /// render.
    pub fn evaluate(&self, route: Route) -> GateOutcome {
        if !route.is_protected() {
            return GateOutcome::Render;
        }
        let outcome = gate(
            self.ctx.has_session(),
            self.ctx.is_loading(),
            self.ctx.is_onboarding_complete(),
            route.requires_onboarding(),
        );
        debug!(route = route.path(), ?outcome, "route gated");
        outcome
    }

    /// The route the gate outcome points at, `None` when it renders.
    pub fn redirect_target(&self, route: Route) -> Option<Route> {
        match self.evaluate(route) {
            GateOutcome::RedirectToLanding => Some(Route::Landing),
            GateOutcome::RedirectToOnboarding => Some(Route::Onboarding),
            GateOutcome::Loading | GateOutcome::Render => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::session;

    fn gate_with(signed_in: bool, complete: bool) -> RouteGate {
        let ctx = AuthContext::arc();
        ctx.finish_loading();
        if signed_in {
            ctx.set_session(Some(session("u1")));
        }
        ctx.set_onboarding_complete(complete);
        RouteGate::new(ctx)
    }

    #[test]
    fn no_session_redirects_settings_to_landing() {
        let gate = gate_with(false, false);
        assert_eq!(
            gate.evaluate(Route::Settings),
            GateOutcome::RedirectToLanding
        );
        assert_eq!(gate.redirect_target(Route::Settings), Some(Route::Landing));
    }

    #[test]
    fn incomplete_onboarding_redirects_settings_to_onboarding() {
        let gate = gate_with(true, false);
        assert_eq!(
            gate.evaluate(Route::Settings),
            GateOutcome::RedirectToOnboarding
        );
        assert_eq!(
            gate.redirect_target(Route::Chat),
            Some(Route::Onboarding)
        );
    }

    #[test]
    fn complete_session_renders_protected_routes() {
        let gate = gate_with(true, true);
        assert_eq!(gate.evaluate(Route::Settings), GateOutcome::Render);
        assert_eq!(gate.evaluate(Route::Chat), GateOutcome::Render);
        assert_eq!(gate.redirect_target(Route::Settings), None);
    }

    #[test]
    fn onboarding_route_needs_session_only() {
        let gate = gate_with(true, false);
        assert_eq!(gate.evaluate(Route::Onboarding), GateOutcome::Render);
    }

    #[test]
    fn public_routes_always_render() {
        let gate = gate_with(false, false);
        assert_eq!(gate.evaluate(Route::Landing), GateOutcome::Render);
        assert_eq!(gate.evaluate(Route::AuthCallback), GateOutcome::Render);
    }

    #[test]
    fn loading_context_reports_loading_for_protected_routes() {
        let ctx = AuthContext::arc();
        let gate = RouteGate::new(ctx);
        assert_eq!(gate.evaluate(Route::Settings), GateOutcome::Loading);
        assert_eq!(gate.redirect_target(Route::Settings), None);
    }
}
