//! Shared authentication context
//!
//! One explicit object owning the session, the loading flag, and the
//! connectivity mode, created at process start and passed to every use
//! case. It replaces ambient globals; teardown happens on sign-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use md_core::{ConnectivityMode, Session, UserId};

pub struct AuthContext {
    session: RwLock<Option<Session>>,
    offline: AtomicBool,
    onboarding_complete: AtomicBool,
    /// Whether the onboarding table is known to exist backend-side.
    table_present: AtomicBool,
    loading_tx: watch::Sender<bool>,
    loading_rx: watch::Receiver<bool>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    pub fn new() -> Self {
        let (loading_tx, loading_rx) = watch::channel(true);
        Self {
            session: RwLock::new(None),
            offline: AtomicBool::new(false),
            onboarding_complete: AtomicBool::new(false),
            table_present: AtomicBool::new(true),
            loading_tx,
            loading_rx,
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // === Session ===

    pub fn session(&self) -> Option<Session> {
        self.session.read().expect("session lock poisoned").clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.session().map(|s| s.user)
    }

    pub fn has_session(&self) -> bool {
        self.session.read().expect("session lock poisoned").is_some()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write().expect("session lock poisoned") = session;
    }

    // === Loading ===

    pub fn is_loading(&self) -> bool {
        *self.loading_rx.borrow()
    }

    /// Force the loading flag false. Idempotent: the bootstrap deadline and
    /// the normal completion path both call this.
    pub fn finish_loading(&self) {
        self.loading_tx.send_if_modified(|loading| {
            let changed = *loading;
            *loading = false;
            changed
        });
    }

    /// Watch channel resolving once loading finishes.
    pub fn loading_watch(&self) -> watch::Receiver<bool> {
        self.loading_rx.clone()
    }

    // === Connectivity ===

    pub fn connectivity(&self) -> ConnectivityMode {
        if self.offline.load(Ordering::SeqCst) {
            ConnectivityMode::Offline
        } else {
            ConnectivityMode::Online
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    // === Onboarding ===

    pub fn is_onboarding_complete(&self) -> bool {
        self.onboarding_complete.load(Ordering::SeqCst)
    }

    pub fn set_onboarding_complete(&self, complete: bool) {
        self.onboarding_complete.store(complete, Ordering::SeqCst);
    }

    pub fn is_table_present(&self) -> bool {
        self.table_present.load(Ordering::SeqCst)
    }

    pub fn set_table_present(&self, present: bool) {
        self.table_present.store(present, Ordering::SeqCst);
    }

    /// Clear all per-actor state. Called on sign-out.
    pub fn teardown(&self) {
        self.set_session(None);
        self.set_onboarding_complete(false);
    }
}
