//! Connectivity mode
//!
//! Decided once during bootstrap and carried in the application context
//! rather than as ambient global state. Components consult it before every
//! backend call; `Offline` means local persistence is the source of truth.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectivityMode {
    #[default]
    Online,
    Offline,
}

impl ConnectivityMode {
    pub fn is_offline(&self) -> bool {
        matches!(self, ConnectivityMode::Offline)
    }
}
