//! Onboarding submission
//!
//! Validation runs first and produces no side effects on failure. After
//! that, local completion is unconditional: the four onboarding fields are
//! written to both stores under scoped and generic keys, the context flag
//! flips, and navigation proceeds immediately. The backend writes are
//! fire-and-forget through the outbox and never block the actor. With no
//! session, offline, or no backing table, the local path runs alone with
//! no network traffic at all.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use md_core::keys;
use md_core::onboarding::{OnboardingRecord, OnboardingSubmission, ONBOARDING_TABLE};
use md_core::ports::{Filter, KeyValueStorePort, NavigatorPort};
use md_core::username::{
    derive_marmail, normalize_marmail, validate_marmail, validate_username, AvailabilityStatus,
    UsernameFormatError,
};
use md_core::{Route, UserId};

use crate::context::AuthContext;
use crate::outbox::{Outbox, OutboxOp};

/// Cookie lifetime for onboarding field writes: one year.
const FIELD_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const MIN_NAME_LEN: usize = 2;

/// Raw form fields as the actor typed them.
#[derive(Debug, Clone, Default)]
pub struct OnboardingForm {
    pub name: String,
    pub username: String,
    /// Editable handle; empty means "derive from the username".
    pub marmail: String,
    pub heard_from: String,
    /// Latest availability verdict for the username field.
    pub availability: AvailabilityStatus,
}

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("Name must be at least 2 characters long")]
    NameTooShort,
    #[error("This username is already taken")]
    UsernameTaken,
    #[error("Please tell us how you heard about us")]
    MissingHeardFrom,
    #[error(transparent)]
    InvalidUsername(#[from] UsernameFormatError),
}

pub struct CompleteOnboarding {
    ctx: Arc<AuthContext>,
    cookies: Arc<dyn KeyValueStorePort>,
    local: Arc<dyn KeyValueStorePort>,
    navigator: Arc<dyn NavigatorPort>,
    outbox: Arc<Outbox>,
}

impl CompleteOnboarding {
    pub fn new(
        ctx: Arc<AuthContext>,
        cookies: Arc<dyn KeyValueStorePort>,
        local: Arc<dyn KeyValueStorePort>,
        navigator: Arc<dyn NavigatorPort>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            ctx,
            cookies,
            local,
            navigator,
            outbox,
        }
    }

    pub async fn execute(&self, form: &OnboardingForm) -> Result<(), SubmitError> {
        let submission = Self::validate(form)?;
        let user = self.ctx.user_id();

        // Local completion happens regardless of backend health; repeated
        // submits rewrite the same keys.
        self.persist_locally(user.as_ref(), &submission).await;
        self.ctx.set_onboarding_complete(true);

        match user {
            Some(user) if self.backend_reachable() => {
                self.enqueue_profile_update(&submission);
                self.enqueue_row_write(submission.into_record(user));
            }
            Some(_) => info!("backend unreachable, onboarding completed locally only"),
            None => info!("no signed-in actor, onboarding completed locally only"),
        }

        self.navigator.replace(Route::Landing);
        Ok(())
    }

    fn backend_reachable(&self) -> bool {
        !self.ctx.is_offline() && self.ctx.is_table_present()
    }

    /// The only user-visible failure path; nothing is written before it
    /// passes.
    fn validate(form: &OnboardingForm) -> Result<OnboardingSubmission, SubmitError> {
        let name = form.name.trim();
        if name.len() < MIN_NAME_LEN {
            return Err(SubmitError::NameTooShort);
        }
        let username = form.username.trim();
        validate_username(username)?;
        if form.availability == AvailabilityStatus::Taken {
            return Err(SubmitError::UsernameTaken);
        }
        let heard_from = form.heard_from.trim();
        if heard_from.is_empty() {
            return Err(SubmitError::MissingHeardFrom);
        }

        let marmail = if form.marmail.trim().is_empty() {
            derive_marmail(username)
                .unwrap_or_else(|| normalize_marmail(&username.to_lowercase()))
        } else {
            let handle = normalize_marmail(form.marmail.trim());
            validate_marmail(&handle)?;
            handle
        };

        Ok(OnboardingSubmission {
            name: name.to_string(),
            username: username.to_string(),
            marmail_email: marmail,
            heard_from: heard_from.to_string(),
        })
    }

    async fn persist_locally(&self, user: Option<&UserId>, submission: &OnboardingSubmission) {
        let fields = [
            (keys::ONBOARDING_COMPLETE, "true".to_string()),
            (keys::USER_NAME, submission.name.clone()),
            (keys::USERNAME, submission.username.clone()),
            (keys::MARMAIL, submission.marmail_email.clone()),
        ];
        for (key, value) in &fields {
            let scoped = keys::scoped(user, key);
            for key in [scoped.as_str(), key] {
                if let Err(err) = self.cookies.set(key, value, Some(FIELD_TTL)).await {
                    warn!(key, error = %err, "cookie write failed");
                }
                if let Err(err) = self.local.set(key, value, None).await {
                    warn!(key, error = %err, "local store write failed");
                }
            }
        }
    }

    /// Fire-and-forget row write. A resubmission collides with the
    /// existing row, so the upsert op lands on it instead of failing.
    fn enqueue_row_write(&self, record: OnboardingRecord) {
        let row = match serde_json::to_value(&record) {
            Ok(row) => row,
            Err(err) => {
                warn!(error = %err, "onboarding row failed to serialize");
                return;
            }
        };
        self.outbox.enqueue(OutboxOp::UpsertRow {
            table: ONBOARDING_TABLE.to_string(),
            key: Filter::eq("user_id", record.user_id.as_str()),
            row,
        });
    }

    fn enqueue_profile_update(&self, submission: &OnboardingSubmission) {
        self.outbox.enqueue(OutboxOp::UpdateProfile {
            changes: serde_json::json!({
                "onboarding_complete": true,
                "name": submission.name,
                "username": submission.username,
                "marmail_email": submission.marmail_email,
            }),
        });
    }
}
