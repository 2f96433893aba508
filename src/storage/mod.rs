//! Storage module for the SkillUp client
//!
//! Durable key-value backends and the token store that persists the
//! session keys on top of them.

mod backend;
mod token_store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use token_store::{
    StorageEvent, TokenStore, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY, TOKEN_KEY, USER_EMAIL_KEY,
    USER_ID_KEY, USER_KEY, USER_ROLE_KEY,
};
