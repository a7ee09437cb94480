//! # md-core
//!
//! Core domain models and business rules for the MarDev client.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

// Public module exports
pub mod connectivity;
pub mod errors;
pub mod keys;
pub mod onboarding;
pub mod ports;
pub mod routing;
pub mod session;
pub mod username;

// Re-export commonly used types at the crate root
pub use connectivity::ConnectivityMode;
pub use errors::BackendError;
pub use onboarding::{OnboardingRecord, OnboardingSubmission};
pub use routing::{gate, GateOutcome, Route};
pub use session::{AuthProvider, Session, SessionEvent, UserId, UserProfile};
pub use username::{AvailabilityStatus, UsernameFormatError};
