//! Shared mock ports for use-case tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use md_core::ports::{BackendAuthPort, BackendQueryPort, Filter, NavigatorPort};
use md_core::{AuthProvider, BackendError, Route, Session, SessionEvent, UserId, UserProfile};

pub fn session(id: &str) -> Session {
    Session {
        user: UserId::from(id),
        profile: UserProfile::default(),
        access_token: "tok".into(),
        refresh_token: None,
    }
}

type SelectResult = Result<Vec<Value>, BackendError>;

/// Query port with scripted select responses and call counters.
pub struct MockQueryPort {
    /// Per-call scripted responses (optional artificial delay first).
    scripted_selects: Mutex<VecDeque<(Duration, SelectResult)>>,
    default_select: Mutex<SelectResult>,
    select_log: Mutex<Vec<(String, Vec<Filter>)>>,
    select_count: AtomicU64,
    insert_attempt_count: AtomicU64,
    insert_count: AtomicU64,
    insert_delay: Mutex<Duration>,
    insert_failure: Mutex<Option<BackendError>>,
    inserted: Mutex<Vec<(String, Value)>>,
    updated: Mutex<Vec<(String, Vec<Filter>, Value)>>,
    deleted: Mutex<Vec<(String, Vec<Filter>)>>,
}

impl Default for MockQueryPort {
    fn default() -> Self {
        Self {
            scripted_selects: Mutex::new(VecDeque::new()),
            default_select: Mutex::new(Ok(Vec::new())),
            select_log: Mutex::new(Vec::new()),
            select_count: AtomicU64::new(0),
            insert_attempt_count: AtomicU64::new(0),
            insert_count: AtomicU64::new(0),
            insert_delay: Mutex::new(Duration::ZERO),
            insert_failure: Mutex::new(None),
            inserted: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

impl MockQueryPort {
    pub fn push_select(&self, delay: Duration, result: SelectResult) {
        self.scripted_selects
            .lock()
            .unwrap()
            .push_back((delay, result));
    }

    pub fn set_default_select(&self, result: SelectResult) {
        *self.default_select.lock().unwrap() = result;
    }

    pub fn fail_inserts_with(&self, err: BackendError) {
        *self.insert_failure.lock().unwrap() = Some(err);
    }

    pub fn delay_inserts(&self, delay: Duration) {
        *self.insert_delay.lock().unwrap() = delay;
    }

    pub fn selects(&self) -> u64 {
        self.select_count.load(Ordering::SeqCst)
    }

    pub fn select_log(&self) -> Vec<(String, Vec<Filter>)> {
        self.select_log.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> u64 {
        self.insert_count.load(Ordering::SeqCst)
    }

    pub fn insert_attempts(&self) -> u64 {
        self.insert_attempt_count.load(Ordering::SeqCst)
    }

    pub fn inserted_rows(&self) -> Vec<(String, Value)> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, Vec<Filter>, Value)> {
        self.updated.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<(String, Vec<Filter>)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendQueryPort for MockQueryPort {
    async fn select(
        &self,
        table: &str,
        _columns: &str,
        filters: &[Filter],
        _limit: Option<u32>,
    ) -> SelectResult {
        self.select_count.fetch_add(1, Ordering::SeqCst);
        self.select_log
            .lock()
            .unwrap()
            .push((table.to_string(), filters.to_vec()));
        let scripted = self.scripted_selects.lock().unwrap().pop_front();
        match scripted {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => self.default_select.lock().unwrap().clone(),
        }
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), BackendError> {
        self.insert_attempt_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.insert_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.insert_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.insert_count.fetch_add(1, Ordering::SeqCst);
        self.inserted.lock().unwrap().push((table.to_string(), row));
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        changes: Value,
    ) -> Result<(), BackendError> {
        self.updated
            .lock()
            .unwrap()
            .push((table.to_string(), filters.to_vec(), changes));
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        self.deleted
            .lock()
            .unwrap()
            .push((table.to_string(), filters.to_vec()));
        Ok(())
    }
}

/// Auth port with a settable session and observable calls.
pub struct MockAuthPort {
    session: Mutex<Option<Session>>,
    session_failure: Mutex<Option<BackendError>>,
    profile_updates: Mutex<Vec<Value>>,
    sign_outs: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for MockAuthPort {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(None),
            session_failure: Mutex::new(None),
            profile_updates: Mutex::new(Vec::new()),
            sign_outs: AtomicU64::new(0),
            events,
        }
    }
}

impl MockAuthPort {
    pub fn with_session(session: Session) -> Self {
        let port = Self::default();
        *port.session.lock().unwrap() = Some(session);
        port
    }

    pub fn fail_session_with(&self, err: BackendError) {
        *self.session_failure.lock().unwrap() = Some(err);
    }

    pub fn profile_updates(&self) -> Vec<Value> {
        self.profile_updates.lock().unwrap().clone()
    }

    pub fn sign_outs(&self) -> u64 {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl BackendAuthPort for MockAuthPort {
    fn authorize_url(&self, provider: AuthProvider, redirect_to: &str) -> String {
        format!(
            "https://auth.example/authorize?provider={}&redirect_to={redirect_to}",
            provider.slug()
        )
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        if let Some(err) = self.session_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, BackendError> {
        let session = Session {
            user: UserId::from("token-user"),
            profile: UserProfile::default(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        };
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn update_profile(&self, changes: Value) -> Result<(), BackendError> {
        self.profile_updates.lock().unwrap().push(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Navigator recording every transition.
#[derive(Default)]
pub struct MockNavigator {
    history: Mutex<Vec<Route>>,
}

impl MockNavigator {
    pub fn history(&self) -> Vec<Route> {
        self.history.lock().unwrap().clone()
    }
}

impl NavigatorPort for MockNavigator {
    fn replace(&self, route: Route) {
        self.history.lock().unwrap().push(route);
    }

    fn current(&self) -> Route {
        self.history
            .lock()
            .unwrap()
            .last()
            .copied()
            .unwrap_or(Route::Landing)
    }
}
