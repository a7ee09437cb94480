//! Use cases
//!
//! One struct per operation, holding `Arc<dyn Port>` references and exposing
//! an `execute()` entry point.

pub mod auth;
pub mod availability;
pub mod bootstrap;
pub mod chat;
pub mod gate;
pub mod resolver;
pub mod settings;
pub mod submit;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{ExchangeAuthCode, RefreshSession, SignIn, SignOut};
pub use availability::UsernameAvailabilityChecker;
pub use bootstrap::BootstrapSession;
pub use chat::{ChatMessage, ChatRoom, CreateRoom, ListRooms, RoomFeed, SendMessage};
pub use gate::RouteGate;
pub use resolver::{FlagSource, OnboardingStatusResolver};
pub use settings::{DeleteAccount, LoadProfile, ProfileData, SaveProfile};
pub use submit::CompleteOnboarding;
