//! Session module for the SkillUp client
//!
//! Holds the in-memory projection of the persisted session and the
//! observable stream consumers subscribe to. Only the auth client publishes.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::auth::User;

/// The signed-in state of this client.
///
/// An access token is never held without the user it belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    user: Option<User>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(
        user: User,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user: Some(user),
            access_token: Some(access_token),
            refresh_token,
            expires_at,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none()
    }
}

/// Observable holder of the current [`Session`].
///
/// Subscribers see the current value first and then every replacement, in the
/// order the auth client completed its operations.
#[derive(Debug)]
pub struct SessionState {
    sender: watch::Sender<Session>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Session::empty());
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        let mut receiver = self.sender.subscribe();
        // Make the current value observable through `changed()` as well.
        receiver.mark_changed();
        receiver
    }

    pub fn current(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.sender.borrow().user().cloned()
    }

    pub(crate) fn publish(&self, session: Session) {
        debug!(
            "Publishing session (authenticated: {})",
            session.access_token().is_some()
        );
        self.sender.send_replace(session);
    }

    pub(crate) fn clear(&self) {
        self.publish(Session::empty());
    }
}
