#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use skillup_client::{
    storage::{MemoryStore, TokenStore},
    Session, SessionContext, Settings, User,
};
use wiremock::MockServer;

pub const REFRESH_TOKEN: &str = "refresh-1";

/// A signed JWT whose `exp` lies `secs` seconds from now.
pub fn token_expiring_in(secs: i64) -> String {
    let claims = json!({
        "sub": "7",
        "email": "ada@example.com",
        "exp": Utc::now().timestamp() + secs,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"integration-secret"))
        .expect("Failed to sign test token")
}

pub fn user_json(role: &str) -> Value {
    json!({
        "id": 7,
        "email": "ada@example.com",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "role": role,
        "isEmailVerified": true,
        "isActive": true
    })
}

pub fn auth_body(token: &str, refresh_token: &str) -> Value {
    json!({
        "success": true,
        "message": "Welcome back",
        "token": token,
        "refreshToken": refresh_token,
        "user": user_json("Student"),
        "expiresAt": (Utc::now() + Duration::hours(1)).to_rfc3339()
    })
}

/// `/Auth/refresh` wraps the auth result in the generic envelope.
pub fn refresh_body(token: &str) -> Value {
    json!({
        "success": true,
        "message": "Token refreshed",
        "data": auth_body(token, "refresh-2")
    })
}

pub fn profile_json() -> Value {
    json!({
        "id": 7,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "skills": ["Analysis"],
        "interests": [],
        "certifications": []
    })
}

pub fn settings_for(server: &MockServer) -> Settings {
    Settings::for_base_url(&format!("{}/api", server.uri())).expect("Failed to build test config")
}

pub async fn setup() -> (MockServer, SessionContext) {
    let server = MockServer::start().await;
    let context = SessionContext::new(settings_for(&server)).expect("Failed to build context");
    (server, context)
}

/// Context restored from storage already holding a Student session.
pub async fn setup_signed_in(access_token: &str, refresh_token: Option<&str>) -> (MockServer, SessionContext) {
    let server = MockServer::start().await;
    let backend = Arc::new(MemoryStore::new());

    let user: User = serde_json::from_value(user_json("Student")).expect("valid user");
    TokenStore::new(backend.clone())
        .save(&Session::authenticated(
            user,
            access_token.to_string(),
            refresh_token.map(str::to_string),
            None,
        ))
        .expect("Failed to seed session");

    let context = SessionContext::with_store(settings_for(&server), backend).expect("Failed to build context");
    (server, context)
}
