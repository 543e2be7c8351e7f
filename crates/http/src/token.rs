//! Access-token inspection
//!
//! Tokens are only decoded, never verified: the backend remains the authority
//! on validity. The client reads `exp` to know when to warn, refresh, or give
//! up on a session.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use thiserror::Error;

/// Claims the client cares about
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    /// Expiry as a unix timestamp
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl AccessClaims {
    /// Seconds left before expiry; zero or negative once expired.
    /// Saturates so an absurd `exp` reads as expired, never as healthy.
    pub const fn remaining_secs(&self, now: i64) -> i64 {
        self.exp.saturating_sub(now)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is not a JWT (expected 3 segments, found {0})")]
    Malformed(usize),

    #[error("token payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("token payload is not valid claims JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Decode the payload segment of a JWT
pub fn decode_claims(token: &str) -> Result<AccessClaims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(TokenError::Malformed(segments.len()));
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Seconds until `token` expires, relative to the unix time `now`
pub fn seconds_until_expiry(token: &str, now: i64) -> Result<i64, TokenError> {
    decode_claims(token).map(|claims| claims.remaining_secs(now))
}

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
