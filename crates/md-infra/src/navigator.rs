//! Tracing navigator
//!
//! Holds the current client-side route and logs transitions. `replace` is
//! idempotent: the deadline races in bootstrap and submit may run the
//! navigate-away step twice.

use std::sync::Mutex;

use tracing::info;

use md_core::ports::NavigatorPort;
use md_core::Route;

pub struct TracingNavigator {
    current: Mutex<Route>,
}

impl Default for TracingNavigator {
    fn default() -> Self {
        Self::new(Route::Landing)
    }
}

impl TracingNavigator {
    pub fn new(initial: Route) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }
}

impl NavigatorPort for TracingNavigator {
    fn replace(&self, route: Route) {
        let mut current = self.current.lock().expect("route lock poisoned");
        if *current != route {
            info!(from = current.path(), to = route.path(), "route replaced");
        }
        *current = route;
    }

    fn current(&self) -> Route {
        *self.current.lock().expect("route lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_landing_and_tracks_replacements() {
        let nav = TracingNavigator::default();
        assert_eq!(nav.current(), Route::Landing);

        nav.replace(Route::Onboarding);
        assert_eq!(nav.current(), Route::Onboarding);

        // Replacing with the same route is a no-op.
        nav.replace(Route::Onboarding);
        assert_eq!(nav.current(), Route::Onboarding);
    }
}
