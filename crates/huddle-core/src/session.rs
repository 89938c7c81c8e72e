//! In-memory authentication state.
//!
//! [`SessionHandle`] is created once at startup and handed to the API client
//! and the command layer explicitly. Clones share the same state.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use huddle_types::{TokenPair, User};

use crate::token_store::TokenStore;

/// Authentication status plus the cached profile.
///
/// `is_logged_in` is true exactly when a non-empty access token is held.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    is_logged_in: bool,
    user: Option<User>,
}

impl Session {
    /// Builds a session from a persisted pair (the startup state).
    pub fn from_tokens(pair: TokenPair) -> Self {
        let mut session = Self::default();
        session.set_tokens(pair);
        session
    }

    pub fn set_tokens(&mut self, pair: TokenPair) {
        self.is_logged_in = !pair.access_token.is_empty();
        self.access_token = pair.access_token;
        self.refresh_token = pair.refresh_token;
    }

    /// Clears both tokens. The cached user is left alone.
    pub fn reset_tokens(&mut self) {
        self.access_token.clear();
        self.refresh_token.clear();
        self.is_logged_in = false;
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn tokens(&self) -> TokenPair {
        TokenPair::new(self.access_token.clone(), self.refresh_token.clone())
    }
}

/// Shared handle over a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    /// Restores the startup session from persisted tokens.
    pub fn restore(store: &dyn TokenStore) -> Result<Self> {
        let pair = store.load()?;
        Ok(Self::new(Session::from_tokens(pair)))
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_tokens(&self, pair: TokenPair) {
        self.write().set_tokens(pair);
    }

    pub fn reset_tokens(&self) {
        self.write().reset_tokens();
    }

    pub fn set_user(&self, user: Option<User>) {
        self.write().set_user(user);
    }

    pub fn access_token(&self) -> String {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        self.read().refresh_token.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_logged_in
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn tokens(&self) -> TokenPair {
        self.read().tokens()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }
}
