use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use omniven_core::UserId;

/// Signed access-token payload.
///
/// `sub` carries the username and `id` the account id; `iat`/`exp` are unix
/// seconds. All four are covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub id: UserId,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token could not be encoded: {0}")]
    Encoding(String),
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub subject_id: UserId,
    pub subject_username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Deterministically validate already-authenticated claims against `now`.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// [`crate::TokenService::verify`] before this is called.
pub fn validate_claims(claims: &AccessClaims, now: DateTime<Utc>) -> Result<TokenIdentity, TokenError> {
    if claims.sub.trim().is_empty() {
        return Err(TokenError::Malformed("missing subject".to_string()));
    }
    if claims.exp <= claims.iat {
        return Err(TokenError::Malformed("expires_at <= issued_at".to_string()));
    }
    if now.timestamp() > claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(TokenIdentity {
        subject_id: claims.id,
        subject_username: claims.sub.clone(),
        issued_at: from_unix(claims.iat)?,
        expires_at: from_unix(claims.exp)?,
    })
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TokenError::Malformed(format!("timestamp out of range: {secs}")))
}
