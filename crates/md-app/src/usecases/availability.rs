//! Username availability checking
//!
//! Debounced backend lookups with generation tagging so a late response
//! from a superseded lookup can never overwrite the status of a newer
//! input. Backend faults and timeouts fail open to `Available`; the
//! submit path re-validates server-side anyway.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use md_core::onboarding::ONBOARDING_TABLE;
use md_core::ports::{BackendQueryPort, Filter};
use md_core::username::{
    validate_username, AvailabilityStatus, UsernameFormatError, USERNAME_MIN_LEN,
};
use md_core::UserId;

use crate::context::AuthContext;

/// Trailing debounce before a lookup fires.
pub const DEBOUNCE: Duration = Duration::from_millis(500);
/// Lookup deadline, after which we fail open.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

struct Inner {
    ctx: Arc<AuthContext>,
    query: Arc<dyn BackendQueryPort>,
    own_user: Option<UserId>,
    status: watch::Sender<AvailabilityStatus>,
    generation: AtomicU64,
    debounce: Duration,
    lookup_timeout: Duration,
}

pub struct UsernameAvailabilityChecker {
    inner: Arc<Inner>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl UsernameAvailabilityChecker {
    pub fn new(
        ctx: Arc<AuthContext>,
        query: Arc<dyn BackendQueryPort>,
        own_user: Option<UserId>,
    ) -> Self {
        Self::with_timing(ctx, query, own_user, DEBOUNCE, LOOKUP_TIMEOUT)
    }

    pub fn with_timing(
        ctx: Arc<AuthContext>,
        query: Arc<dyn BackendQueryPort>,
        own_user: Option<UserId>,
        debounce: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        let (status, _) = watch::channel(AvailabilityStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                ctx,
                query,
                own_user,
                status,
                generation: AtomicU64::new(0),
                debounce,
                lookup_timeout,
            }),
            pending: Mutex::new(None),
        }
    }

    pub fn status(&self) -> AvailabilityStatus {
        *self.inner.status.borrow()
    }

    /// Watch handle for status transitions.
    pub fn watch(&self) -> watch::Receiver<AvailabilityStatus> {
        self.inner.status.subscribe()
    }

    /// Feed one keystroke of input. Empty or too-short candidates drop
    /// the status back to `Idle` with no message shown; other format
    /// errors reset to `Idle` and are returned for inline display; valid
    /// input schedules a debounced lookup.
    pub fn on_input(&self, raw: &str) -> Result<(), UsernameFormatError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_pending();

        if raw.chars().count() < USERNAME_MIN_LEN {
            self.inner.status.send_replace(AvailabilityStatus::Idle);
            return Ok(());
        }
        if let Err(err) = validate_username(raw) {
            self.inner.status.send_replace(AvailabilityStatus::Idle);
            return Err(err);
        }
        let username = raw.to_string();

        // No lookup can answer offline or without the backing table; the
        // submit path re-validates server-side once back online.
        if self.inner.ctx.is_offline() || !self.inner.ctx.is_table_present() {
            self.inner.status.send_replace(AvailabilityStatus::Available);
            return Ok(());
        }

        self.inner.status.send_replace(AvailabilityStatus::Checking);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            let status = inner.lookup(&username).await;
            // Discard responses a later input has superseded.
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.status.send_replace(status);
            } else {
                debug!(%username, "discarding stale availability result");
            }
        });
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(handle);
        }
        Ok(())
    }

    /// Drop the status back to `Idle`, superseding any in-flight lookup.
    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_pending();
        self.inner.status.send_replace(AvailabilityStatus::Idle);
    }

    fn cancel_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for UsernameAvailabilityChecker {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

impl Inner {
    async fn lookup(&self, username: &str) -> AvailabilityStatus {
        let mut filters = vec![Filter::eq("username", username)];
        if let Some(user) = &self.own_user {
            // An actor re-submitting their own username sees it available.
            filters.push(Filter::neq("user_id", user.as_str()));
        }

        let select = self
            .query
            .select(ONBOARDING_TABLE, "user_id", &filters, Some(1));
        match tokio::time::timeout(self.lookup_timeout, select).await {
            Ok(Ok(rows)) if rows.is_empty() => AvailabilityStatus::Available,
            Ok(Ok(_)) => AvailabilityStatus::Taken,
            Ok(Err(err)) => {
                warn!(%username, error = %err, "availability lookup failed, assuming available");
                AvailabilityStatus::Available
            }
            Err(_) => {
                warn!(%username, "availability lookup timed out, assuming available");
                AvailabilityStatus::Available
            }
        }
    }
}
