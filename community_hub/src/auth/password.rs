//! Argon2id password hashing with a server-side pepper.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::{Rng, distr::Alphanumeric};
use std::sync::Arc;

use super::errors::{AuthError, AuthResult};

/// Length of passwords generated for accounts created by Google sign-in
const GENERATED_PASSWORD_LEN: usize = 32;

/// Hashes and verifies passwords on the blocking pool.
#[derive(Clone)]
pub struct PepperedHasher {
    pepper: Arc<str>,
}

impl PepperedHasher {
    pub fn new(pepper: impl Into<Arc<str>>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// Hash password with Argon2id + pepper
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(peppered.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| AuthError::HashingFailed)
        })
        .await
        .map_err(|_| AuthError::HashingFailed)?
    }

    /// Verify password against hash
    pub async fn verify(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash).map_err(|_| AuthError::InvalidPassword)?;
            Argon2::default()
                .verify_password(peppered.as_bytes(), &parsed_hash)
                .map_err(|_| AuthError::InvalidPassword)
        })
        .await
        .map_err(|_| AuthError::HashingFailed)?
    }
}

/// Random password for accounts that never log in with one.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
