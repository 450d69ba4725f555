//! HS256 signature verification on top of [`validate_claims`].

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Shared-secret (HS256) validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in our own RFC3339 claims, checked by `validate_claims`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                TokenValidationError::Malformed(e.to_string())
            })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrincipalId;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn fresh_claims() -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: PrincipalId::new(),
            issued_at: now - Duration::seconds(1),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn accepts_token_signed_with_same_secret() {
        let claims = fresh_claims();
        let token = mint("s3cret", &claims);
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert_eq!(v.validate(&token, Utc::now()).unwrap(), claims);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = mint("other", &fresh_claims());
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert!(matches!(
            v.validate(&token, Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn signature_ok_but_expired_is_rejected() {
        let claims = fresh_claims();
        let token = mint("s3cret", &claims);
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let later = claims.expires_at + Duration::seconds(1);
        assert_eq!(v.validate(&token, later), Err(TokenValidationError::Expired));
    }
}
