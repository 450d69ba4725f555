use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalId;

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims expected once a token has been decoded and its
/// signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or unsigned token: {0}")]
    Malformed(String),
}

/// Deterministically validate JWT claims.
///
/// Validates the *claims* only; signature verification happens in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(issued: DateTime<Utc>, ttl_secs: i64) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            issued_at: issued,
            expires_at: issued + Duration::seconds(ttl_secs),
        }
    }

    #[test]
    fn valid_window_passes() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims(now, 60), now), Ok(()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let c = claims(now - Duration::seconds(120), 60);
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::Expired));
    }

    #[test]
    fn future_token_is_rejected() {
        let now = Utc::now();
        let c = claims(now + Duration::seconds(30), 60);
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let c = claims(now, -1);
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
