//! Navigator port
//!
//! Abstracts route transitions. `replace` mirrors a history-replacing
//! navigation and must be idempotent: the deadline races in bootstrap and
//! submit may run the navigate-away step twice.

use crate::routing::Route;

pub trait NavigatorPort: Send + Sync {
    /// Replace the current route.
    fn replace(&self, route: Route);

    fn current(&self) -> Route;
}
