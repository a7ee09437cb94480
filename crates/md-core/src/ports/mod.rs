//! Port interfaces for the application layer
//!
//! Ports define the contract between the use cases and infrastructure
//! implementations, keeping the core logic independent of the concrete
//! backend client, persistence stores, and host environment.

pub mod auth;
pub mod clock;
pub mod key_value;
pub mod navigator;
pub mod query;
pub mod realtime;
pub mod token_exchange;

pub use auth::BackendAuthPort;
pub use clock::ClockPort;
pub use key_value::KeyValueStorePort;
pub use navigator::NavigatorPort;
pub use query::{BackendQueryPort, Filter, FilterOp};
pub use realtime::{RealtimeFeedPort, RealtimeSubscription};
pub use token_exchange::{TokenExchangePort, TokenPair};
