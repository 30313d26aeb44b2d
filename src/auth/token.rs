//! Session tokens: HS256-signed JWTs binding an account id for 24 hours.
//!
//! Verification is pure. It checks, in order: structure, algorithm (only
//! HS256 is accepted), signature against the current secret, expiry, then the
//! subject. Each failure has its own [`TokenError`] variant; callers outside
//! this module collapse them into a generic response.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::secret::{SecretError, SecretSource};
use crate::store::AccountId;

/// Lifetime of every issued token.
pub const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signed with an unexpected algorithm")]
    WrongAlgorithm,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token has no subject")]
    MissingSubject,
    #[error("token subject is not an account id")]
    InvalidSubject,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl TokenError {
    /// True for failures caused by the token itself rather than by the server.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Signing(_) | Self::Secret(_))
    }
}

/// Verified claims of a session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Claims {
    pub sub: AccountId,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Serialize)]
struct IssuedClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct ReceivedClaims {
    #[serde(default)]
    sub: Option<Subject>,
    iat: i64,
    exp: i64,
}

// Subjects are issued as decimal strings; plain JSON numbers are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Subject {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl Subject {
    fn account_id(self) -> Result<AccountId, TokenError> {
        let id = match self {
            Self::Number(id) => id,
            Self::Text(text) => text.parse().map_err(|_| TokenError::InvalidSubject)?,
            Self::Other(_) => return Err(TokenError::InvalidSubject),
        };
        if id > 0 {
            Ok(AccountId(id))
        } else {
            Err(TokenError::InvalidSubject)
        }
    }
}

/// Issues and verifies session tokens with the secret from a [`SecretSource`].
#[derive(Clone, Debug)]
pub struct TokenCodec {
    secret: Arc<dyn SecretSource>,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: Arc<dyn SecretSource>) -> Self {
        Self { secret }
    }

    /// Sign a token for `account_id`, valid from `now` for [`TOKEN_TTL_SECONDS`].
    ///
    /// # Errors
    /// Returns an error if the secret cannot be resolved or signing fails.
    pub fn issue(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let secret = self.secret.current()?;
        let issued_at = now.timestamp();
        let claims = IssuedClaims {
            sub: account_id.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECONDS,
        };

        encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    /// Verify `token` as of `now` and return its claims.
    ///
    /// # Errors
    /// Returns the specific reason the token was rejected, or
    /// [`TokenError::Secret`] when no secret is available.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let secret = self.secret.current()?;

        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ReceivedClaims>(
            token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|err| match err.kind() {
            ErrorKind::InvalidAlgorithm => TokenError::WrongAlgorithm,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })?;

        let received = data.claims;
        if now.timestamp() >= received.exp {
            return Err(TokenError::Expired);
        }

        let sub = received
            .sub
            .ok_or(TokenError::MissingSubject)?
            .account_id()?;

        Ok(Claims {
            sub,
            iat: received.iat,
            exp: received.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::secret::StaticSecret;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).single().unwrap_or_default()
    }

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(Arc::new(StaticSecret::new(secret)))
    }

    fn sign_raw(secret: &str, algorithm: Algorithm, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(algorithm),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap_or_default()
    }

    #[test]
    fn issue_then_verify_returns_subject() -> Result<(), TokenError> {
        let codec = codec("secret");
        let token = codec.issue(AccountId(42), now())?;
        let claims = codec.verify(&token, now())?;
        assert_eq!(claims.sub, AccountId(42));
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + TOKEN_TTL_SECONDS);
        Ok(())
    }

    #[test]
    fn valid_until_just_before_expiry() -> Result<(), TokenError> {
        let codec = codec("secret");
        let token = codec.issue(AccountId(1), now())?;
        let almost = now() + Duration::seconds(TOKEN_TTL_SECONDS - 1);
        assert_eq!(codec.verify(&token, almost)?.sub, AccountId(1));
        Ok(())
    }

    #[test]
    fn expired_at_and_after_expiry() -> Result<(), TokenError> {
        let codec = codec("secret");
        let token = codec.issue(AccountId(1), now())?;
        let at_expiry = now() + Duration::hours(24);
        assert!(matches!(
            codec.verify(&token, at_expiry),
            Err(TokenError::Expired)
        ));
        let later = now() + Duration::days(3);
        assert!(matches!(
            codec.verify(&token, later),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn rejects_token_from_other_secret() -> Result<(), TokenError> {
        let token = codec("other-secret").issue(AccountId(1), now())?;
        assert!(matches!(
            codec("secret").verify(&token, now()),
            Err(TokenError::BadSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_altered_payload() -> Result<(), TokenError> {
        let codec = codec("secret");
        let original = codec.issue(AccountId(1), now())?;
        let other = codec.issue(AccountId(2), now())?;

        let original_parts: Vec<&str> = original.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        assert_eq!(original_parts.len(), 3);
        let forged = format!(
            "{}.{}.{}",
            original_parts[0], other_parts[1], original_parts[2]
        );
        assert!(matches!(
            codec.verify(&forged, now()),
            Err(TokenError::BadSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_other_hmac_algorithm() {
        let claims = json!({"sub": "1", "iat": NOW, "exp": NOW + 60});
        let token = sign_raw("secret", Algorithm::HS512, &claims);
        assert!(matches!(
            codec("secret").verify(&token, now()),
            Err(TokenError::WrongAlgorithm)
        ));
    }

    #[test]
    fn rejects_garbage() {
        let codec = codec("secret");
        for token in ["", "abc", "a.b", "a.b.c", "a.b.c.d"] {
            let result = codec.verify(token, now());
            assert!(result.is_err(), "{token} should not verify");
            if let Err(err) = result {
                assert!(err.is_rejection());
            }
        }
        assert!(matches!(
            codec.verify("not-a-token", now()),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn rejects_missing_subject() {
        let claims = json!({"iat": NOW, "exp": NOW + 60});
        let token = sign_raw("secret", Algorithm::HS256, &claims);
        assert!(matches!(
            codec("secret").verify(&token, now()),
            Err(TokenError::MissingSubject)
        ));
    }

    #[test]
    fn rejects_non_numeric_subject() {
        for sub in [json!("alice"), json!(""), json!(true), json!("-3"), json!(0)] {
            let claims = json!({"sub": sub, "iat": NOW, "exp": NOW + 60});
            let token = sign_raw("secret", Algorithm::HS256, &claims);
            assert!(matches!(
                codec("secret").verify(&token, now()),
                Err(TokenError::InvalidSubject)
            ));
        }
    }

    #[test]
    fn accepts_numeric_json_subject() -> Result<(), TokenError> {
        let claims = json!({"sub": 9, "iat": NOW, "exp": NOW + 60});
        let token = sign_raw("secret", Algorithm::HS256, &claims);
        assert_eq!(codec("secret").verify(&token, now())?.sub, AccountId(9));
        Ok(())
    }

    #[test]
    fn missing_secret_is_not_a_rejection() {
        let codec = TokenCodec::new(Arc::new(StaticSecret::new("")));
        let result = codec.issue(AccountId(1), now());
        assert!(matches!(result, Err(TokenError::Secret(_))));
        if let Err(err) = result {
            assert!(!err.is_rejection());
        }
    }
}
