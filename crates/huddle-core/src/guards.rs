//! Routes and the session guards that gate them.

use std::fmt;

use crate::session::{Session, SessionHandle};

/// Navigable locations of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    App,
    Profile,
    CreateGroup,
    Group { name: String, id: String },
    NotFound,
}

impl Route {
    /// Entry point for visitors without a session.
    pub const UNAUTHENTICATED_ENTRY: Route = Route::Login;
    /// Entry point once logged in.
    pub const AUTHENTICATED_ENTRY: Route = Route::App;

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/auth/login".to_string(),
            Route::Register => "/auth/register".to_string(),
            Route::App => "/app".to_string(),
            Route::Profile => "/app/profile".to_string(),
            Route::CreateGroup => "/app/createGroup".to_string(),
            Route::Group { name, id } => format!("/app/{name}/{id}"),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Parses a path; anything unrecognized is [`Route::NotFound`].
    pub fn parse(path: &str) -> Route {
        let segments: Vec<&str> = path
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            ["auth"] | ["auth", "login"] => Route::Login,
            ["auth", "register"] => Route::Register,
            [] | ["app"] => Route::App,
            ["app", "profile"] => Route::Profile,
            ["app", "createGroup"] => Route::CreateGroup,
            ["app", name, id] => Route::Group {
                name: (*name).to_string(),
                id: (*id).to_string(),
            },
            _ => Route::NotFound,
        }
    }

    /// Guard protecting this route, if any.
    pub fn guard(&self) -> Option<Guard> {
        match self {
            Route::Login | Route::Register => Some(Guard::UnauthenticatedOnly),
            Route::App | Route::Profile | Route::CreateGroup | Route::Group { .. } => {
                Some(Guard::AuthenticatedOnly)
            }
            Route::NotFound => None,
        }
    }

    /// Resolves what happens when navigating here under the given session.
    pub fn resolve(&self, status: &impl AuthStatus) -> GuardOutcome {
        self.guard()
            .map_or(GuardOutcome::Render, |guard| guard.check(status))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// The single capability guards need.
pub trait AuthStatus {
    fn is_logged_in(&self) -> bool;
}

impl AuthStatus for Session {
    fn is_logged_in(&self) -> bool {
        Session::is_logged_in(self)
    }
}

impl AuthStatus for SessionHandle {
    fn is_logged_in(&self) -> bool {
        SessionHandle::is_logged_in(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Protected content; visitors go to the login route.
    AuthenticatedOnly,
    /// Login/register; signed-in users go to the app.
    UnauthenticatedOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Render,
    Redirect(Route),
}

impl Guard {
    pub fn check(self, status: &impl AuthStatus) -> GuardOutcome {
        match (self, status.is_logged_in()) {
            (Guard::AuthenticatedOnly, true) | (Guard::UnauthenticatedOnly, false) => {
                GuardOutcome::Render
            }
            (Guard::AuthenticatedOnly, false) => {
                GuardOutcome::Redirect(Route::UNAUTHENTICATED_ENTRY)
            }
            (Guard::UnauthenticatedOnly, true) => {
                GuardOutcome::Redirect(Route::AUTHENTICATED_ENTRY)
            }
        }
    }
}
