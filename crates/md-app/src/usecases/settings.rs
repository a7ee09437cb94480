//! Profile settings
//!
//! Reads resolve each field through the same priority chain the resolver
//! uses for the completion flag: scoped store keys, generic store keys,
//! profile metadata, then the backend row when reachable. Saves are
//! local-first with best-effort backend writes through the outbox.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use md_core::keys;
use md_core::onboarding::ONBOARDING_TABLE;
use md_core::ports::{BackendAuthPort, BackendQueryPort, Filter, KeyValueStorePort, NavigatorPort};
use md_core::username::{
    derive_marmail, normalize_marmail, validate_marmail, validate_username, AvailabilityStatus,
};
use md_core::{Route, UserId};

use crate::context::AuthContext;
use crate::outbox::{Outbox, OutboxOp};
use crate::usecases::submit::SubmitError;

const FIELD_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const MIN_NAME_LEN: usize = 2;

/// Profile fields as the settings surface shows them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileData {
    pub name: Option<String>,
    pub username: Option<String>,
    pub marmail: Option<String>,
}

impl ProfileData {
    fn is_complete(&self) -> bool {
        self.name.is_some() && self.username.is_some() && self.marmail.is_some()
    }
}

pub struct LoadProfile {
    ctx: Arc<AuthContext>,
    query: Arc<dyn BackendQueryPort>,
    cookies: Arc<dyn KeyValueStorePort>,
    local: Arc<dyn KeyValueStorePort>,
}

impl LoadProfile {
    pub fn new(
        ctx: Arc<AuthContext>,
        query: Arc<dyn BackendQueryPort>,
        cookies: Arc<dyn KeyValueStorePort>,
        local: Arc<dyn KeyValueStorePort>,
    ) -> Self {
        Self {
            ctx,
            query,
            cookies,
            local,
        }
    }

    pub async fn execute(&self) -> ProfileData {
        let user = self.ctx.user_id();
        let mut data = ProfileData {
            name: self.read_field(user.as_ref(), keys::USER_NAME).await,
            username: self.read_field(user.as_ref(), keys::USERNAME).await,
            marmail: self.read_field(user.as_ref(), keys::MARMAIL).await,
        };

        if !data.is_complete() {
            self.fill_from_metadata(&mut data);
        }
        if !data.is_complete() && !self.ctx.is_offline() && self.ctx.is_table_present() {
            if let Some(user) = &user {
                self.fill_from_row(user, &mut data).await;
            }
        }
        data
    }

    /// Scoped keys win over generic ones; the local store wins over the
    /// cookie jar at each scope.
    async fn read_field(&self, user: Option<&UserId>, key: &str) -> Option<String> {
        let scoped = keys::scoped(user, key);
        for key in [scoped.as_str(), key] {
            for store in [&self.local, &self.cookies] {
                match store.get(key).await {
                    Ok(Some(value)) if !value.is_empty() => return Some(value),
                    Ok(_) => {}
                    Err(err) => warn!(key, error = %err, "store read failed"),
                }
            }
        }
        None
    }

    fn fill_from_metadata(&self, data: &mut ProfileData) {
        let Some(session) = self.ctx.session() else {
            return;
        };
        let profile = &session.profile;
        if data.name.is_none() {
            data.name = profile.name().map(str::to_string);
        }
        if data.username.is_none() {
            data.username = profile.username().map(str::to_string);
        }
        if data.marmail.is_none() {
            data.marmail = profile.marmail_email().map(str::to_string);
        }
    }

    /// Backend errors fall back silently to whatever is already loaded.
    async fn fill_from_row(&self, user: &UserId, data: &mut ProfileData) {
        let filters = [Filter::eq("user_id", user.as_str())];
        let rows = match self
            .query
            .select(ONBOARDING_TABLE, "*", &filters, Some(1))
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                debug!(error = %err, "profile row fetch failed, using local data");
                return;
            }
        };
        let Some(row) = rows.first() else { return };
        let field = |col: &str| row.get(col).and_then(|v| v.as_str()).map(str::to_string);
        if data.name.is_none() {
            data.name = field("name");
        }
        if data.username.is_none() {
            data.username = field("username");
        }
        if data.marmail.is_none() {
            data.marmail = field("marmail_email");
        }
    }
}

/// Edited profile fields plus the availability verdict for the username.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: String,
    pub username: String,
    pub marmail: String,
    /// Username the profile currently holds; an unchanged username skips
    /// the availability verdict.
    pub previous_username: Option<String>,
    pub availability: AvailabilityStatus,
}

pub struct SaveProfile {
    ctx: Arc<AuthContext>,
    cookies: Arc<dyn KeyValueStorePort>,
    local: Arc<dyn KeyValueStorePort>,
    outbox: Arc<Outbox>,
}

impl SaveProfile {
    pub fn new(
        ctx: Arc<AuthContext>,
        cookies: Arc<dyn KeyValueStorePort>,
        local: Arc<dyn KeyValueStorePort>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            ctx,
            cookies,
            local,
            outbox,
        }
    }

    pub async fn execute(&self, edit: &ProfileEdit) -> Result<(), SubmitError> {
        let name = edit.name.trim();
        if name.len() < MIN_NAME_LEN {
            return Err(SubmitError::NameTooShort);
        }
        let username = edit.username.trim();
        validate_username(username)?;
        let username_changed = edit
            .previous_username
            .as_deref()
            .map_or(true, |prev| prev != username);
        if username_changed && edit.availability == AvailabilityStatus::Taken {
            return Err(SubmitError::UsernameTaken);
        }
        let marmail = if edit.marmail.trim().is_empty() {
            derive_marmail(username)
                .unwrap_or_else(|| normalize_marmail(&username.to_lowercase()))
        } else {
            let handle = normalize_marmail(edit.marmail.trim());
            validate_marmail(&handle)?;
            handle
        };

        let user = self.ctx.user_id();
        let fields = [
            (keys::USER_NAME, name.to_string()),
            (keys::USERNAME, username.to_string()),
            (keys::MARMAIL, marmail.clone()),
        ];
        for (key, value) in &fields {
            let scoped = keys::scoped(user.as_ref(), key);
            for key in [scoped.as_str(), key] {
                if let Err(err) = self.cookies.set(key, value, Some(FIELD_TTL)).await {
                    warn!(key, error = %err, "cookie write failed");
                }
                if let Err(err) = self.local.set(key, value, None).await {
                    warn!(key, error = %err, "local store write failed");
                }
            }
        }

        // Backend writes are best effort and never fail the save.
        if let Some(user) = user {
            self.outbox.enqueue(OutboxOp::UpdateProfile {
                changes: serde_json::json!({
                    "name": name,
                    "username": username,
                    "marmail_email": marmail,
                }),
            });
            self.outbox.enqueue(OutboxOp::UpdateRow {
                table: ONBOARDING_TABLE.to_string(),
                filters: vec![Filter::eq("user_id", user.as_str())],
                changes: serde_json::json!({
                    "name": name,
                    "username": username,
                    "marmail_email": marmail,
                }),
            });
        }
        Ok(())
    }
}

/// Wipe every locally persisted field, queue the backend cleanup, and run
/// the sign-out path.
pub struct DeleteAccount {
    ctx: Arc<AuthContext>,
    auth: Arc<dyn BackendAuthPort>,
    cookies: Arc<dyn KeyValueStorePort>,
    local: Arc<dyn KeyValueStorePort>,
    navigator: Arc<dyn NavigatorPort>,
    outbox: Arc<Outbox>,
}

impl DeleteAccount {
    pub fn new(
        ctx: Arc<AuthContext>,
        auth: Arc<dyn BackendAuthPort>,
        cookies: Arc<dyn KeyValueStorePort>,
        local: Arc<dyn KeyValueStorePort>,
        navigator: Arc<dyn NavigatorPort>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            ctx,
            auth,
            cookies,
            local,
            navigator,
            outbox,
        }
    }

    pub async fn execute(&self) {
        let user = self.ctx.user_id();

        for key in keys::FLAG_KEYS {
            let scoped = keys::scoped(user.as_ref(), key);
            for key in [scoped.as_str(), key] {
                if let Err(err) = self.cookies.remove(key).await {
                    warn!(key, error = %err, "cookie removal failed");
                }
                if let Err(err) = self.local.remove(key).await {
                    warn!(key, error = %err, "local store removal failed");
                }
            }
        }
        for key in [keys::AUTH_TOKEN, keys::REFRESH_TOKEN] {
            if let Err(err) = self.cookies.remove(key).await {
                warn!(key, error = %err, "token cookie removal failed");
            }
        }

        if let Some(user) = &user {
            self.outbox.enqueue(OutboxOp::DeleteRow {
                table: ONBOARDING_TABLE.to_string(),
                filters: vec![Filter::eq("user_id", user.as_str())],
            });
            self.outbox.enqueue(OutboxOp::UpdateProfile {
                changes: serde_json::json!({
                    "onboarding_complete": false,
                    "name": null,
                    "username": null,
                    "marmail_email": null,
                }),
            });
        }

        if !self.ctx.is_offline() {
            if let Err(err) = self.auth.sign_out().await {
                warn!(error = %err, "backend sign-out failed during account deletion");
            }
        }
        self.ctx.teardown();
        self.navigator.replace(Route::Landing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{session, MockAuthPort, MockNavigator, MockQueryPort};
    use md_core::username::UsernameFormatError;
    use md_infra::kv::MemoryKeyValueStore;

    struct Fixture {
        ctx: Arc<AuthContext>,
        query: Arc<MockQueryPort>,
        cookies: Arc<MemoryKeyValueStore>,
        local: Arc<MemoryKeyValueStore>,
        outbox: Arc<Outbox>,
    }

    fn fixture() -> Fixture {
        let ctx = AuthContext::arc();
        ctx.set_session(Some(session("u1")));
        let query = Arc::new(MockQueryPort::default());
        Fixture {
            ctx,
            outbox: Arc::new(Outbox::spawn(
                Arc::new(MockAuthPort::default()),
                query.clone(),
            )),
            query,
            cookies: Arc::new(MemoryKeyValueStore::default()),
            local: Arc::new(MemoryKeyValueStore::default()),
        }
    }

    fn loader(f: &Fixture) -> LoadProfile {
        LoadProfile::new(
            f.ctx.clone(),
            f.query.clone(),
            f.cookies.clone(),
            f.local.clone(),
        )
    }

    #[tokio::test]
    async fn load_prefers_scoped_local_values() {
        let f = fixture();
        f.local
            .set("user_u1_mardev_user_name", "Local Ada", None)
            .await
            .unwrap();
        f.cookies
            .set("mardev_user_name", "Cookie Ada", None)
            .await
            .unwrap();
        f.query
            .set_default_select(Ok(vec![serde_json::json!({ "name": "Row Ada" })]));

        let data = loader(&f).execute().await;
        assert_eq!(data.name.as_deref(), Some("Local Ada"));
    }

    #[tokio::test]
    async fn load_falls_through_to_metadata_then_row() {
        let f = fixture();
        let mut s = session("u1");
        s.profile.set("name", serde_json::json!("Meta Ada"));
        f.ctx.set_session(Some(s));
        f.query.set_default_select(Ok(vec![serde_json::json!({
            "username": "row-ada",
            "marmail_email": "row-ada#mardev.app",
        })]));

        let data = loader(&f).execute().await;
        assert_eq!(data.name.as_deref(), Some("Meta Ada"));
        assert_eq!(data.username.as_deref(), Some("row-ada"));
        assert_eq!(data.marmail.as_deref(), Some("row-ada#mardev.app"));
    }

    #[tokio::test]
    async fn load_survives_backend_errors_silently() {
        let f = fixture();
        f.local
            .set("mardev_username", "cached", None)
            .await
            .unwrap();
        f.query
            .set_default_select(Err(md_core::BackendError::Timeout));

        let data = loader(&f).execute().await;
        assert_eq!(data.username.as_deref(), Some("cached"));
        assert_eq!(data.name, None);
    }

    #[tokio::test]
    async fn load_skips_the_row_when_offline() {
        let f = fixture();
        f.ctx.set_offline(true);
        loader(&f).execute().await;
        assert_eq!(f.query.selects(), 0);
    }

    #[tokio::test]
    async fn save_writes_local_first_and_queues_backend_writes() {
        let f = fixture();
        let uc = SaveProfile::new(
            f.ctx.clone(),
            f.cookies.clone(),
            f.local.clone(),
            f.outbox.clone(),
        );

        uc.execute(&ProfileEdit {
            name: "Ada".into(),
            username: "ada-l".into(),
            marmail: String::new(),
            previous_username: Some("old-ada".into()),
            availability: AvailabilityStatus::Available,
        })
        .await
        .unwrap();

        assert_eq!(
            f.local.get("user_u1_mardev_username").await.unwrap(),
            Some("ada-l".into())
        );
        assert_eq!(
            f.cookies.get("mardev_marmail").await.unwrap(),
            Some("ada-l#mardev.app".into())
        );

        while f.outbox.delivered() < 2 {
            tokio::task::yield_now().await;
        }
        let updates = f.query.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "user_onboarding");
    }

    #[tokio::test]
    async fn save_with_unchanged_username_ignores_the_taken_verdict() {
        let f = fixture();
        let uc = SaveProfile::new(
            f.ctx.clone(),
            f.cookies.clone(),
            f.local.clone(),
            f.outbox.clone(),
        );

        uc.execute(&ProfileEdit {
            name: "Ada".into(),
            username: "ada-l".into(),
            marmail: String::new(),
            previous_username: Some("ada-l".into()),
            availability: AvailabilityStatus::Taken,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn save_rejects_grammar_violations() {
        let f = fixture();
        let uc = SaveProfile::new(
            f.ctx.clone(),
            f.cookies.clone(),
            f.local.clone(),
            f.outbox.clone(),
        );

        let err = uc
            .execute(&ProfileEdit {
                name: "Ada".into(),
                username: "admin".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::InvalidUsername(UsernameFormatError::Reserved));
        assert_eq!(f.local.get("mardev_username").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_every_key_and_signs_out() {
        let f = fixture();
        for key in ["mardev_username", "user_u1_mardev_username"] {
            f.local.set(key, "ada-l", None).await.unwrap();
            f.cookies.set(key, "ada-l", None).await.unwrap();
        }
        f.cookies.set("mardev_auth", "tok", None).await.unwrap();
        let auth = Arc::new(MockAuthPort::with_session(session("u1")));
        let navigator = Arc::new(MockNavigator::default());
        let uc = DeleteAccount::new(
            f.ctx.clone(),
            auth.clone(),
            f.cookies.clone(),
            f.local.clone(),
            navigator.clone(),
            f.outbox.clone(),
        );

        uc.execute().await;

        for key in ["mardev_username", "user_u1_mardev_username", "mardev_auth"] {
            assert_eq!(f.cookies.get(key).await.unwrap(), None, "{key}");
        }
        assert_eq!(f.local.get("mardev_username").await.unwrap(), None);
        assert_eq!(auth.sign_outs(), 1);
        assert!(!f.ctx.has_session());
        assert_eq!(navigator.history(), vec![Route::Landing]);

        while f.outbox.delivered() < 2 {
            tokio::task::yield_now().await;
        }
        let deletes = f.query.deletes();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].0, "user_onboarding");
    }
}
