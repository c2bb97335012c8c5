//! Authentication state shared between a client and whoever drives it.

use secrecy::SecretString;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::User;

#[derive(Debug, Default)]
struct SessionState {
    token: Option<SecretString>,
    user: Option<User>,
}

/// Cloneable handle to the current bearer token and logged-in user.
///
/// Clones share state. Written only on login, register and logout.
#[derive(Clone, Debug, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-issued token; the user stays unknown until fetched.
    pub fn with_token(token: SecretString) -> Self {
        let session = Self::new();
        session.write().token = Some(token);
        session
    }

    pub fn set_credentials(&self, token: SecretString, user: User) {
        let mut state = self.write();
        state.token = Some(token);
        state.user = Some(user);
    }

    pub fn set_user(&self, user: User) {
        self.write().user = Some(user);
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.token = None;
        state.user = None;
    }

    pub fn token(&self) -> Option<SecretString> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    // A panic while holding the lock leaves plain data behind; keep using it.
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
