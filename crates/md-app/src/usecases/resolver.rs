//! Onboarding status resolver
//!
//! Consults a priority-ordered list of named flag sources (cookie, local
//! store, profile metadata, backend row) and returns the first positive
//! result, self-healing lower-priority local sources when a backend source
//! disagrees with them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use md_core::keys;
use md_core::onboarding::ONBOARDING_TABLE;
use md_core::ports::{BackendAuthPort, BackendQueryPort, Filter, KeyValueStorePort};
use md_core::UserId;

/// Cookie lifetime for flag writes: one year.
pub const FLAG_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// One named source of the onboarding-complete flag with a uniform
/// read/write/invalidate capability.
#[async_trait]
pub trait FlagSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the source works without backend connectivity.
    fn is_local(&self) -> bool;

    /// `None` means the source has no opinion; absence is never an error.
    async fn read(&self, user: &UserId) -> anyhow::Result<Option<bool>>;

    async fn write(&self, user: &UserId, complete: bool) -> anyhow::Result<()>;

    async fn invalidate(&self, user: &UserId) -> anyhow::Result<()>;
}

/// Flag cached in a key-value store under the scoped and generic keys.
pub struct StoreFlagSource {
    name: &'static str,
    store: Arc<dyn KeyValueStorePort>,
    ttl: Option<Duration>,
}

impl StoreFlagSource {
    pub fn cookie(store: Arc<dyn KeyValueStorePort>) -> Self {
        Self {
            name: "cookie",
            store,
            ttl: Some(FLAG_TTL),
        }
    }

    pub fn local(store: Arc<dyn KeyValueStorePort>) -> Self {
        Self {
            name: "local-store",
            store,
            ttl: None,
        }
    }
}

#[async_trait]
impl FlagSource for StoreFlagSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn read(&self, user: &UserId) -> anyhow::Result<Option<bool>> {
        let scoped = keys::scoped(Some(user), keys::ONBOARDING_COMPLETE);
        for key in [scoped.as_str(), keys::ONBOARDING_COMPLETE] {
            if let Some(value) = self.store.get(key).await? {
                return Ok(Some(value == "true"));
            }
        }
        Ok(None)
    }

    async fn write(&self, user: &UserId, complete: bool) -> anyhow::Result<()> {
        let value = if complete { "true" } else { "false" };
        let scoped = keys::scoped(Some(user), keys::ONBOARDING_COMPLETE);
        self.store.set(&scoped, value, self.ttl).await?;
        self.store.set(keys::ONBOARDING_COMPLETE, value, self.ttl).await
    }

    async fn invalidate(&self, user: &UserId) -> anyhow::Result<()> {
        let scoped = keys::scoped(Some(user), keys::ONBOARDING_COMPLETE);
        self.store.remove(&scoped).await?;
        self.store.remove(keys::ONBOARDING_COMPLETE).await
    }
}

/// Flag carried in the actor's profile metadata.
pub struct ProfileFlagSource {
    auth: Arc<dyn BackendAuthPort>,
}

impl ProfileFlagSource {
    pub fn new(auth: Arc<dyn BackendAuthPort>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl FlagSource for ProfileFlagSource {
    fn name(&self) -> &'static str {
        "profile-metadata"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn read(&self, _user: &UserId) -> anyhow::Result<Option<bool>> {
        let session = self.auth.current_session().await?;
        Ok(session.and_then(|s| s.profile.onboarding_complete()))
    }

    async fn write(&self, _user: &UserId, complete: bool) -> anyhow::Result<()> {
        self.auth
            .update_profile(serde_json::json!({ "onboarding_complete": complete }))
            .await?;
        Ok(())
    }

    async fn invalidate(&self, user: &UserId) -> anyhow::Result<()> {
        self.write(user, false).await
    }
}

/// Flag stored in the actor's `user_onboarding` row.
pub struct RecordFlagSource {
    query: Arc<dyn BackendQueryPort>,
}

impl RecordFlagSource {
    pub fn new(query: Arc<dyn BackendQueryPort>) -> Self {
        Self { query }
    }
}

#[async_trait]
impl FlagSource for RecordFlagSource {
    fn name(&self) -> &'static str {
        "onboarding-record"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn read(&self, user: &UserId) -> anyhow::Result<Option<bool>> {
        let filters = [Filter::eq("user_id", user.as_str())];
        match self
            .query
            .select(ONBOARDING_TABLE, "is_complete", &filters, Some(1))
            .await
        {
            Ok(rows) => Ok(rows
                .first()
                .and_then(|row| row.get("is_complete"))
                .and_then(|v| v.as_bool())),
            // Missing row or missing table: not complete, not a fault.
            Err(err) if err.is_row_not_found() || err.is_missing_table() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, user: &UserId, complete: bool) -> anyhow::Result<()> {
        let filters = [Filter::eq("user_id", user.as_str())];
        self.query
            .update(
                ONBOARDING_TABLE,
                &filters,
                serde_json::json!({ "is_complete": complete }),
            )
            .await?;
        Ok(())
    }

    async fn invalidate(&self, user: &UserId) -> anyhow::Result<()> {
        self.write(user, false).await
    }
}

/// First-true-wins resolver with write-back over an ordered source list.
pub struct OnboardingStatusResolver {
    sources: Vec<Arc<dyn FlagSource>>,
}

impl OnboardingStatusResolver {
    pub fn new(sources: Vec<Arc<dyn FlagSource>>) -> Self {
        Self { sources }
    }

    /// Standard source order: cookie, local store, profile metadata,
    /// backend row.
    pub fn standard(
        cookies: Arc<dyn KeyValueStorePort>,
        local: Arc<dyn KeyValueStorePort>,
        auth: Arc<dyn BackendAuthPort>,
        query: Arc<dyn BackendQueryPort>,
    ) -> Self {
        Self::new(vec![
            Arc::new(StoreFlagSource::cookie(cookies)),
            Arc::new(StoreFlagSource::local(local)),
            Arc::new(ProfileFlagSource::new(auth)),
            Arc::new(RecordFlagSource::new(query)),
        ])
    }

    /// Resolve the completion flag for `user`. With `offline` set, only
    /// local sources are consulted and absence means "not complete".
    pub async fn resolve(&self, user: &UserId, offline: bool) -> bool {
        for (index, source) in self.sources.iter().enumerate() {
            if offline && !source.is_local() {
                continue;
            }
            match source.read(user).await {
                Ok(Some(true)) => {
                    debug!(source = source.name(), %user, "onboarding flag positive");
                    if !source.is_local() {
                        self.repair_local_sources(user, index).await;
                    }
                    return true;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(source = source.name(), %user, error = %err, "flag source read failed");
                }
            }
        }
        false
    }

    /// Write `true` back to every local source that sits above `winner` in
    /// priority order, so the next resolve short-circuits locally.
    async fn repair_local_sources(&self, user: &UserId, winner: usize) {
        for source in self.sources.iter().take(winner).filter(|s| s.is_local()) {
            if let Err(err) = source.write(user, true).await {
                warn!(source = source.name(), %user, error = %err, "flag write-back failed");
            }
        }
    }
}
