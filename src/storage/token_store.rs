use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::auth::User;
use crate::error::StorageError;
use crate::session::Session;
use crate::storage::KeyValueStore;

pub const TOKEN_KEY: &str = "skillup_token";
pub const REFRESH_TOKEN_KEY: &str = "skillup_refresh_token";
pub const USER_KEY: &str = "skillup_user";
pub const EXPIRES_AT_KEY: &str = "skillup_expires_at";
pub const USER_ID_KEY: &str = "skillup_user_id";
pub const USER_ROLE_KEY: &str = "skillup_user_role";
pub const USER_EMAIL_KEY: &str = "skillup_user_email";

const ALL_KEYS: [&str; 7] = [
    TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    USER_KEY,
    EXPIRES_AT_KEY,
    USER_ID_KEY,
    USER_ROLE_KEY,
    USER_EMAIL_KEY,
];

/// A mutation of persisted storage made by another client sharing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// The user key was removed elsewhere, i.e. another client logged out.
    pub fn signals_logout(&self) -> bool {
        self.key == USER_KEY && self.new_value.as_deref().map_or(true, str::is_empty)
    }
}

/// Persists the session keys. Owned by the auth client.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Writes every key of an authenticated session in one batch.
    /// An empty session clears the store instead.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let (Some(token), Some(user)) = (session.access_token(), session.user()) else {
            return self.clear();
        };

        let user_json = serde_json::to_string(user)
            .map_err(|e| StorageError::Corrupt(format!("Failed to serialize user: {}", e)))?;

        let mut entries = vec![
            (TOKEN_KEY, token.to_string()),
            (USER_KEY, user_json),
            (USER_ID_KEY, user.id.to_string()),
            (USER_ROLE_KEY, user.role.clone()),
            (USER_EMAIL_KEY, user.email.clone()),
        ];
        if let Some(refresh) = session.refresh_token() {
            entries.push((REFRESH_TOKEN_KEY, refresh.to_string()));
        }
        if let Some(expires_at) = session.expires_at() {
            entries.push((EXPIRES_AT_KEY, expires_at.to_rfc3339()));
        }

        // Stale optional keys from a previous session must not survive.
        let mut stale = Vec::new();
        if session.refresh_token().is_none() {
            stale.push(REFRESH_TOKEN_KEY);
        }
        if session.expires_at().is_none() {
            stale.push(EXPIRES_AT_KEY);
        }

        self.backend.apply(&entries, &stale)?;
        debug!("Stored session for user {}", user.id);
        Ok(())
    }

    /// Reconstructs the stored session, or an empty one when the token or
    /// user is missing or any stored value fails to parse.
    pub fn load(&self) -> Session {
        match self.try_load() {
            Ok(Some(session)) => session,
            Ok(None) => Session::empty(),
            Err(e) => {
                warn!("Ignoring unreadable stored session: {}", e);
                Session::empty()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Session>, StorageError> {
        let Some(token) = self.backend.get(TOKEN_KEY)?.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(user_json) = self.backend.get(USER_KEY)? else {
            return Ok(None);
        };
        let user: User = serde_json::from_str(&user_json)
            .map_err(|e| StorageError::Corrupt(format!("stored user: {}", e)))?;

        let expires_at = match self.backend.get(EXPIRES_AT_KEY)? {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| StorageError::Corrupt(format!("stored expiry: {}", e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        let refresh_token = self.backend.get(REFRESH_TOKEN_KEY)?.filter(|t| !t.is_empty());

        Ok(Some(Session::authenticated(user, token, refresh_token, expires_at)))
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove_many(&ALL_KEYS)
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<User> {
        self.read(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn user_id(&self) -> Option<i64> {
        self.read(USER_ID_KEY).and_then(|raw| raw.parse().ok())
    }

    pub fn user_role(&self) -> Option<String> {
        self.read(USER_ROLE_KEY)
    }

    pub fn user_email(&self) -> Option<String> {
        self.read(USER_EMAIL_KEY)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read(EXPIRES_AT_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {} from storage: {}", key, e);
                None
            }
        }
    }
}
