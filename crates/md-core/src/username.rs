//! Username grammar and MarMail handle rules
//!
//! Format validation runs before any network check and independently of
//! connectivity. The grammar: 3-20 characters from `[a-zA-Z0-9_-]`, no
//! leading/trailing or doubled special characters, not all digits, not a
//! reserved word.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed suffix appended to every MarMail handle.
pub const MARMAIL_SUFFIX: &str = "#mardev.app";

/// Minimum username length; shorter candidates read as "still typing".
pub const USERNAME_MIN_LEN: usize = 3;
const MAX_LEN: usize = 20;

const RESERVED: [&str; 10] = [
    "admin", "root", "api", "www", "mail", "support", "help", "info", "contact", "about",
];

static CHARSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
static ALL_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Result of an availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    #[default]
    Idle,
    Checking,
    Available,
    Taken,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameFormatError {
    #[error("Username must be at least 3 characters long")]
    TooShort,
    #[error("Username must be no more than 20 characters long")]
    TooLong,
    #[error("Username can only contain letters, numbers, hyphens, and underscores")]
    InvalidCharacters,
    #[error("Username cannot start or end with hyphens or underscores")]
    EdgeSpecialCharacter,
    #[error("Username cannot have consecutive special characters")]
    DoubledSpecialCharacter,
    #[error("Username cannot be all numbers")]
    AllDigits,
    #[error("This username is reserved and cannot be used")]
    Reserved,
}

/// Validate a candidate against the full grammar.
pub fn validate_username(candidate: &str) -> Result<(), UsernameFormatError> {
    if candidate.len() < USERNAME_MIN_LEN {
        return Err(UsernameFormatError::TooShort);
    }
    if candidate.len() > MAX_LEN {
        return Err(UsernameFormatError::TooLong);
    }
    if !CHARSET.is_match(candidate) {
        return Err(UsernameFormatError::InvalidCharacters);
    }
    let edge = |c: char| c == '-' || c == '_';
    if candidate.starts_with(edge) || candidate.ends_with(edge) {
        return Err(UsernameFormatError::EdgeSpecialCharacter);
    }
    if ["--", "__", "-_", "_-"].iter().any(|p| candidate.contains(p)) {
        return Err(UsernameFormatError::DoubledSpecialCharacter);
    }
    if ALL_DIGITS.is_match(candidate) {
        return Err(UsernameFormatError::AllDigits);
    }
    if RESERVED.contains(&candidate.to_lowercase().as_str()) {
        return Err(UsernameFormatError::Reserved);
    }
    Ok(())
}

/// Validate a full MarMail handle: fixed suffix, then the username grammar
/// on what remains.
pub fn validate_marmail(handle: &str) -> Result<(), UsernameFormatError> {
    let local = handle
        .strip_suffix(MARMAIL_SUFFIX)
        .ok_or(UsernameFormatError::InvalidCharacters)?;
    validate_username(local)
}

/// Derive the MarMail handle for a username: lowercase, strip anything
/// outside `[a-z0-9_-]`, append the suffix. Empty once cleaned means no
/// handle.
pub fn derive_marmail(username: &str) -> Option<String> {
    let clean: String = username
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect();
    if clean.is_empty() {
        None
    } else {
        Some(format!("{clean}{MARMAIL_SUFFIX}"))
    }
}

/// Re-append the suffix when the handle was edited without it.
pub fn normalize_marmail(input: &str) -> String {
    if input.contains(MARMAIL_SUFFIX) {
        input.to_string()
    } else {
        format!("{input}{MARMAIL_SUFFIX}")
    }
}
