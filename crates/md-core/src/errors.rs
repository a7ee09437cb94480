//! Backend error taxonomy
//!
//! Classification drives the degraded-mode behaviour everywhere in the
//! client: connectivity failures downgrade to offline mode, not-found
//! conditions are negative results, and everything else is logged and
//! swallowed on best-effort paths. Nothing here is fatal to the process.

use thiserror::Error;

/// Backend status codes that indicate the service is unreachable rather
/// than merely unhappy with the request.
const CONNECTIVITY_CODES: [&str; 2] = ["PGRST301", "PGRST302"];

/// Row lookups that matched nothing.
const ROW_NOT_FOUND_CODE: &str = "PGRST116";

/// The queried table has not been provisioned.
const MISSING_TABLE_CODE: &str = "42P01";

/// An insert collided with an existing row.
const CONFLICT_CODE: &str = "23505";

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend error {code}: {message}")]
    Api { code: String, message: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl BackendError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True when the failure means the backend is unreachable. Any other
    /// error (missing table included) still proves the service answered.
    pub fn is_connectivity_failure(&self) -> bool {
        match self {
            BackendError::Transport(_) | BackendError::Timeout => true,
            BackendError::Api { code, .. } => CONNECTIVITY_CODES.contains(&code.as_str()),
            BackendError::Unauthorized(_) => false,
        }
    }

    /// "No matching row", a negative result rather than a fault.
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, BackendError::Api { code, .. } if code == ROW_NOT_FOUND_CODE)
    }

    /// The table does not exist yet.
    pub fn is_missing_table(&self) -> bool {
        matches!(self, BackendError::Api { code, .. } if code == MISSING_TABLE_CODE)
    }

    /// A unique-constraint violation; the row already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Api { code, .. } if code == CONFLICT_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_timeout_are_connectivity_failures() {
        assert!(BackendError::Transport("connection refused".into()).is_connectivity_failure());
        assert!(BackendError::Timeout.is_connectivity_failure());
    }

    #[test]
    fn specific_codes_are_connectivity_failures() {
        assert!(BackendError::api("PGRST301", "jwt expired").is_connectivity_failure());
        assert!(BackendError::api("PGRST302", "anonymous access").is_connectivity_failure());
    }

    #[test]
    fn missing_table_is_not_a_connectivity_failure() {
        let err = BackendError::api("42P01", "relation does not exist");
        assert!(!err.is_connectivity_failure());
        assert!(err.is_missing_table());
    }

    #[test]
    fn duplicate_key_is_a_conflict() {
        let err = BackendError::api("23505", "duplicate key value");
        assert!(err.is_conflict());
        assert!(!err.is_connectivity_failure());
    }

    #[test]
    fn row_not_found_is_a_negative_result() {
        let err = BackendError::api("PGRST116", "0 rows");
        assert!(err.is_row_not_found());
        assert!(!err.is_connectivity_failure());
    }
}
