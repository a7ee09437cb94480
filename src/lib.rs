//! MarDev client library
//!
//! Thin shell over the workspace crates: wires the backend clients and
//! local stores into the application layer and exposes the builder.

pub mod builder;

pub use builder::App;
pub use md_app::{AppDeps, AuthContext, Outbox, OutboxOp};
pub use md_core::{GateOutcome, Route, Session};
pub use md_infra::AppConfig;
