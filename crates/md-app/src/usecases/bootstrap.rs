//! Session bootstrap
//!
//! Probes backend connectivity, restores the current session, resolves the
//! onboarding flag, and drops the loading gate. A hard deadline guarantees
//! the gate drops even when the backend hangs, and a listener keeps the
//! context in sync with later session events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use md_core::ports::{BackendAuthPort, BackendQueryPort};
use md_core::SessionEvent;

use crate::context::AuthContext;
use crate::usecases::resolver::OnboardingStatusResolver;

/// Table probed to classify connectivity.
pub const PROBE_TABLE: &str = "chat_rooms";
/// Probe deadline before we assume the backend is unreachable.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Hard ceiling on the whole bootstrap; the loading gate drops at this
/// point no matter what is still in flight.
pub const BOOTSTRAP_DEADLINE: Duration = Duration::from_secs(5);

pub struct BootstrapSession {
    ctx: Arc<AuthContext>,
    auth: Arc<dyn BackendAuthPort>,
    query: Arc<dyn BackendQueryPort>,
    resolver: Arc<OnboardingStatusResolver>,
    probe_timeout: Duration,
    deadline: Duration,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl BootstrapSession {
    pub fn new(
        ctx: Arc<AuthContext>,
        auth: Arc<dyn BackendAuthPort>,
        query: Arc<dyn BackendQueryPort>,
        resolver: Arc<OnboardingStatusResolver>,
    ) -> Self {
        Self::with_timing(ctx, auth, query, resolver, PROBE_TIMEOUT, BOOTSTRAP_DEADLINE)
    }

    pub fn with_timing(
        ctx: Arc<AuthContext>,
        auth: Arc<dyn BackendAuthPort>,
        query: Arc<dyn BackendQueryPort>,
        resolver: Arc<OnboardingStatusResolver>,
        probe_timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            ctx,
            auth,
            query,
            resolver,
            probe_timeout,
            deadline,
            listener: Mutex::new(None),
        }
    }

    /// Run the bootstrap sequence and start the session-event listener.
    /// On return the loading gate is down and the context reflects
    /// connectivity, session, and onboarding state.
    pub async fn execute(&self) {
        let watchdog = self.spawn_deadline_watchdog();

        self.probe_connectivity().await;
        if !self.ctx.is_offline() {
            self.restore_session().await;
        }

        self.ctx.finish_loading();
        watchdog.abort();

        self.start_event_listener();
        info!(
            offline = self.ctx.is_offline(),
            signed_in = self.ctx.has_session(),
            onboarding_complete = self.ctx.is_onboarding_complete(),
            "bootstrap finished"
        );
    }

    fn spawn_deadline_watchdog(&self) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let deadline = self.deadline;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            // Only the probe classifies connectivity; the watchdog just
            // stops the gate from blocking the UI forever.
            warn!(?deadline, "bootstrap deadline hit, dropping loading gate");
            ctx.finish_loading();
        })
    }

    /// Probe a known table with a short deadline. Transport faults, probe
    /// timeouts, and expired-token codes mean offline; a missing-table
    /// error means the backend is reachable but unprovisioned; any other
    /// API error still proves reachability.
    async fn probe_connectivity(&self) {
        let select = self.query.select(PROBE_TABLE, "id", &[], Some(1));
        match tokio::time::timeout(self.probe_timeout, select).await {
            Ok(Ok(_)) => {
                self.ctx.set_offline(false);
                self.ctx.set_table_present(true);
            }
            Ok(Err(err)) if err.is_missing_table() => {
                debug!(table = PROBE_TABLE, "probe table missing, staying online");
                self.ctx.set_offline(false);
                self.ctx.set_table_present(false);
            }
            Ok(Err(err)) if err.is_connectivity_failure() => {
                warn!(error = %err, "connectivity probe failed, entering offline mode");
                self.ctx.set_offline(true);
            }
            Ok(Err(err)) => {
                debug!(error = %err, "probe returned an API error, backend reachable");
                self.ctx.set_offline(false);
            }
            Err(_) => {
                warn!("connectivity probe timed out, entering offline mode");
                self.ctx.set_offline(true);
            }
        }
    }

    async fn restore_session(&self) {
        // Session fetch errors read as "nobody signed in"; the probe alone
        // decides connectivity.
        let session = match self.auth.current_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "session restore failed, continuing without one");
                None
            }
        };

        if let Some(session) = session {
            let user = session.user.clone();
            self.ctx.set_session(Some(session));
            let complete = self.resolver.resolve(&user, self.ctx.is_offline()).await;
            self.ctx.set_onboarding_complete(complete);
        }
    }

    /// Keep the context in sync with sign-in, token-refresh, and sign-out
    /// events for the life of the process.
    fn start_event_listener(&self) {
        let ctx = Arc::clone(&self.ctx);
        let resolver = Arc::clone(&self.resolver);
        let mut events = self.auth.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::SignedIn(session)) => {
                        let user = session.user.clone();
                        // Metadata on the event is authoritative when
                        // positive; otherwise fall back to the resolver.
                        let metadata_flag = session.profile.onboarding_complete();
                        ctx.set_session(Some(session));
                        let complete = match metadata_flag {
                            Some(true) => true,
                            _ => resolver.resolve(&user, ctx.is_offline()).await,
                        };
                        ctx.set_onboarding_complete(complete);
                    }
                    Ok(SessionEvent::TokenRefreshed(session)) => {
                        ctx.set_session(Some(session));
                    }
                    Ok(SessionEvent::SignedOut) => {
                        ctx.teardown();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(old) = listener.replace(handle) {
                old.abort();
            }
        }
    }
}

impl Drop for BootstrapSession {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}
