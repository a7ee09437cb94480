//! Onboarding domain models
//!
//! One [`OnboardingRecord`] row exists per actor in the backend store;
//! username uniqueness is enforced by the backend and advisorily
//! pre-checked by the client.

use serde::{Deserialize, Serialize};

use crate::session::UserId;

/// Backend table holding one onboarding row per actor.
pub const ONBOARDING_TABLE: &str = "user_onboarding";

/// One row per actor in the `user_onboarding` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRecord {
    pub user_id: UserId,
    pub name: String,
    pub username: String,
    pub marmail_email: String,
    pub heard_from: String,
    pub is_complete: bool,
}

/// Form payload collected by the onboarding flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingSubmission {
    pub name: String,
    pub username: String,
    pub marmail_email: String,
    pub heard_from: String,
}

impl OnboardingSubmission {
    /// Build the backend row for this submission.
    pub fn into_record(self, user_id: UserId) -> OnboardingRecord {
        OnboardingRecord {
            user_id,
            name: self.name,
            username: self.username,
            marmail_email: self.marmail_email,
            heard_from: self.heard_from,
            is_complete: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_built_from_submission_is_complete() {
        let submission = OnboardingSubmission {
            name: "Ada".into(),
            username: "ada-l".into(),
            marmail_email: "ada-l#mardev.app".into(),
            heard_from: "friend".into(),
        };
        let record = submission.into_record(UserId::from("u1"));
        assert!(record.is_complete);
        assert_eq!(record.user_id.as_str(), "u1");
        assert_eq!(record.username, "ada-l");
    }
}
