//! Unverified access-token claim decoding.
//!
//! The client only peeks at `exp` and `sub` to decide whether a token still
//! looks usable. Nothing here checks the signature: a token that decodes
//! and has not expired is *probably* accepted by the server, nothing more.
//! Real verification stays on the server.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims the client cares about. The server may add more; they are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
}

/// Decode the claims of a JWT without verifying its signature or expiry.
pub fn decode_unverified(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Expiry details derived from a token's claims at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub remaining_minutes: i64,
    pub is_expired: bool,
    pub subject: Option<String>,
}

impl TokenInfo {
    pub fn from_claims(claims: &Claims, now: DateTime<Utc>) -> Option<Self> {
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single()?;
        let remaining = (expires_at - now).num_seconds().max(0);

        Some(Self {
            expires_at,
            remaining_seconds: remaining,
            remaining_minutes: remaining / 60,
            is_expired: claims.exp <= now.timestamp(),
            subject: claims.sub.clone(),
        })
    }

    /// Decode `token` and describe it relative to the current time.
    /// Malformed tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        let claims = decode_unverified(token).ok()?;
        Self::from_claims(&claims, Utc::now())
    }

    /// Whether less than `threshold` of lifetime remains.
    /// The server applies the same rule when deciding to rotate.
    pub fn needs_refresh(&self, threshold: Duration) -> bool {
        self.is_expired || self.remaining_seconds < threshold.num_seconds()
    }
}

/// True when `token` decodes and its `exp` lies strictly in the future.
pub fn is_live(token: &str) -> bool {
    match decode_unverified(token) {
        Ok(claims) => claims.exp > Utc::now().timestamp(),
        Err(_) => false,
    }
}
