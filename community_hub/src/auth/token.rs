//! Signed session tokens.
//!
//! A token is an HS256 JWT carrying the subject's id, the issue time and the
//! expiry. Nothing about a session is stored server side: the expiry inside
//! the token is the only lifetime control, and deleting the cookie is the only
//! way to end a session early.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    errors::{AuthError, AuthResult},
    models::UserId,
};

/// How long a session token stays valid after issue
pub const SESSION_TTL_DAYS: i64 = 7;

/// Claims embedded in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Reasons a token fails verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature mismatch or a malformed token
    #[error("Invalid token")]
    InvalidSignature,

    /// Verified, but at or past its expiry
    #[error("Token expired")]
    Expired,
}

/// Issues and verifies session tokens with one symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec from the signing secret
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingSecret` - The secret is empty
    pub fn new(secret: &str) -> AuthResult<Self> {
        if secret.trim().is_empty() {
            return Err(AuthError::MissingSecret);
        }

        // Expiry is checked in `verify_at` against an explicit instant with no
        // leeway; the library only checks the signature and claim presence.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::days(SESSION_TTL_DAYS),
        })
    }

    /// Lifetime of tokens issued by this codec
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject`, valid for [`SESSION_TTL_DAYS`] from now.
    pub fn issue(&self, subject: UserId) -> AuthResult<String> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, subject: UserId, now: DateTime<Utc>) -> AuthResult<String> {
        let claims = SessionClaims {
            sub: subject,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        self.verify_at(token, Utc::now()).map(|claims| claims.sub)
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// The signature is checked first, so a tampered token is always reported
    /// as `InvalidSignature` even when its claimed expiry has also passed.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                log::debug!("Rejected session token: {e}");
                TokenError::InvalidSignature
            })?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    const SECRET: &str = "unit-test-signing-secret-0123456789";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET).unwrap()
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(matches!(TokenCodec::new(""), Err(AuthError::MissingSecret)));
        assert!(matches!(TokenCodec::new("   "), Err(AuthError::MissingSecret)));
    }

    #[test]
    fn test_expiry_is_seven_days_after_issue() {
        let codec = codec();
        let now = Utc::now();
        let token = codec.issue_at(Uuid::new_v4(), now).unwrap();
        let claims = codec.verify_at(&token, now).unwrap();

        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let issued = Utc::now();
        let token = codec.issue_at(Uuid::new_v4(), issued).unwrap();
        let expires = issued + codec.ttl();

        assert!(codec.verify_at(&token, expires - Duration::seconds(1)).is_ok());
        assert_eq!(codec.verify_at(&token, expires), Err(TokenError::Expired));
        assert_eq!(
            codec.verify_at(&token, expires + Duration::days(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_stale_token_is_expired_now() {
        let codec = codec();
        let token = codec
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(8))
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_other_secret_is_invalid_signature() {
        let token = codec().issue(Uuid::new_v4()).unwrap();
        let other = TokenCodec::new("a-completely-different-secret-value").unwrap();

        assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_invalid_signature() {
        let codec = codec();
        assert_eq!(codec.verify(""), Err(TokenError::InvalidSignature));
        assert_eq!(codec.verify("invalid.token.here"), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_expired_token_reports_signature() {
        let codec = codec();
        let token = codec
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(30))
            .unwrap();
        let mut tampered = token.into_bytes();
        let last = tampered.len() - 2;
        tampered[last] ^= 0b0000_0100;
        let tampered = String::from_utf8(tampered).unwrap();

        assert_eq!(codec.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    proptest! {
        #[test]
        fn prop_issue_then_verify_returns_subject(raw in any::<u128>()) {
            let codec = codec();
            let subject = Uuid::from_u128(raw);
            let token = codec.issue(subject).unwrap();
            prop_assert_eq!(codec.verify(&token), Ok(subject));
        }

        #[test]
        fn prop_flipped_bit_never_verifies(raw in any::<u128>(), index in any::<prop::sample::Index>(), bit in 0u8..7) {
            let codec = codec();
            let subject = Uuid::from_u128(raw);
            let token = codec.issue(subject).unwrap();

            let mut bytes = token.clone().into_bytes();
            let position = index.index(bytes.len());
            bytes[position] ^= 1 << bit;
            let tampered = String::from_utf8(bytes);
            prop_assume!(tampered.is_ok());
            let tampered = tampered.unwrap();
            prop_assume!(tampered != token);

            prop_assert_eq!(codec.verify(&tampered), Err(TokenError::InvalidSignature));
        }
    }
}
