//! Navigation signals raised outside the command layer.
//!
//! The request layer cannot render anything itself; when it ends a session it
//! asks the [`Navigator`] to move the user to the login route.

use std::sync::{Mutex, PoisonError};

use crate::guards::Route;

pub trait Navigator: Send + Sync {
    fn redirect(&self, route: Route);
}

/// Keeps every redirect it receives.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<Route> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, route: Route) {
        tracing::info!(route = %route, "redirect requested");
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_redirects_in_order() {
        let nav = RecordingNavigator::new();
        nav.redirect(Route::Login);
        nav.redirect(Route::App);

        assert_eq!(nav.redirects(), vec![Route::Login, Route::App]);
        assert_eq!(nav.last(), Some(Route::App));
        assert_eq!(nav.redirects().len(), 2);
    }
}
