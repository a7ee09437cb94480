//! MarDev application orchestration layer
//!
//! This crate contains the client's use cases: session bootstrap, the
//! onboarding status resolver, username availability checking, the
//! onboarding form controller, settings, chat, and the write outbox.

pub mod context;
pub mod deps;
pub mod outbox;
pub mod usecases;

pub use context::AuthContext;
pub use deps::AppDeps;
pub use outbox::{Outbox, OutboxOp};
