//! Application dependencies
//!
//! Bundle of port implementations handed to the use cases by the builder.

use std::sync::Arc;

use md_core::ports::{
    BackendAuthPort, BackendQueryPort, ClockPort, KeyValueStorePort, NavigatorPort,
    RealtimeFeedPort, TokenExchangePort,
};

#[derive(Clone)]
pub struct AppDeps {
    pub auth: Arc<dyn BackendAuthPort>,
    pub query: Arc<dyn BackendQueryPort>,
    pub realtime: Arc<dyn RealtimeFeedPort>,
    pub exchange: Arc<dyn TokenExchangePort>,
    /// Browser-cookie-shaped store: honours TTLs.
    pub cookies: Arc<dyn KeyValueStorePort>,
    /// Persistent local key-value store: ignores TTLs.
    pub local: Arc<dyn KeyValueStorePort>,
    pub clock: Arc<dyn ClockPort>,
    pub navigator: Arc<dyn NavigatorPort>,
}
