// Shared by several test binaries; not every helper is used by each.
#![allow(dead_code)]

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use tableside_core::auth::{Claims, MemoryTokenStore};
use tableside_core::SessionManager;

/// Mint a signed token for `sub` expiring `exp_offset_secs` from now.
pub fn make_token(sub: &str, exp_offset_secs: i64) -> String {
    let claims = Claims {
        sub: Some(sub.to_string()),
        exp: Utc::now().timestamp() + exp_offset_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .expect("Failed to encode test token")
}

/// Session against `base_url` holding `token`, backed by memory storage.
pub fn session_with_token(base_url: &str, token: Option<&str>) -> SessionManager {
    let session = SessionManager::new(Client::new(), base_url, Box::new(MemoryTokenStore::new()));
    if let Some(token) = token {
        session.set_token(token).expect("Failed to set token");
    }
    session
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
