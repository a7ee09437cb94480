//! Persisted flag keys
//!
//! The four onboarding fields are cached under a generic key and an
//! actor-scoped key in both persistence stores. Generic keys are a cache of
//! the most-recently-active actor's scoped keys; no strong consistency is
//! guaranteed between the two.

use crate::session::UserId;

pub const ONBOARDING_COMPLETE: &str = "mardev_onboarding_complete";
pub const USER_NAME: &str = "mardev_user_name";
pub const USERNAME: &str = "mardev_username";
pub const MARMAIL: &str = "mardev_marmail";

/// Auth token cookies written by the legacy OAuth callback.
pub const AUTH_TOKEN: &str = "mardev_auth";
pub const REFRESH_TOKEN: &str = "mardev_refresh";

/// All four onboarding field keys, in write order.
pub const FLAG_KEYS: [&str; 4] = [ONBOARDING_COMPLETE, USER_NAME, USERNAME, MARMAIL];

/// Actor-scoped variant of a key; `temp_` prefix when nobody is signed in.
pub fn scoped(user: Option<&UserId>, key: &str) -> String {
    match user {
        Some(user) => format!("user_{}_{}", user.as_str(), key),
        None => format!("temp_{key}"),
    }
}
