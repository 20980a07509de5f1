//! Bearer-token inspection.
//!
//! The backend issues JWTs. The client never verifies signatures; it only
//! reads the `exp` claim to decide locally whether a stored token is worth
//! sending to the backend for verification.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::Deserialize;
use time::OffsetDateTime;

/// The subset of JWT claims the client cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as Unix seconds.
    pub exp: Option<i64>,
    /// Issued-at as Unix seconds.
    pub iat: Option<i64>,
    pub sub: Option<String>,
}

/// Decode the payload segment of a three-part JWT. Returns `None` for anything
/// that is not shaped like one.
#[must_use]
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if payload.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry instant encoded in the token, if any.
#[must_use]
pub fn token_expiry(token: &str) -> Option<OffsetDateTime> {
    let exp = decode_claims(token)?.exp?;
    OffsetDateTime::from_unix_timestamp(exp).ok()
}

/// True unless the token decodes and its `exp` lies strictly after `now`.
#[must_use]
pub fn is_token_expired_at(token: &str, now: OffsetDateTime) -> bool {
    token_expiry(token).is_none_or(|exp| exp <= now)
}

#[must_use]
pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, OffsetDateTime::now_utc())
}
