//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::ErrorKind;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Required field missing from the request
    #[error("{0}")]
    MissingField(String),

    /// Profile field failed validation
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// No user with that email
    #[error("User doesn't exist")]
    UnknownEmail,

    /// Password verification failed
    #[error("Invalid credentials")]
    InvalidPassword,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Email already exists
    #[error("User already exists")]
    EmailTaken,

    /// Username already exists
    #[error("Username already taken")]
    UsernameTaken,

    /// Request carried no session token
    #[error("Unauthorized: No token provided")]
    NoCredential,

    /// Session token did not verify
    #[error("Unauthorized: {0}")]
    InvalidCredential(#[from] TokenError),

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Signing secret missing at startup
    #[error("Token signing secret is not configured")]
    MissingSecret,
}

impl AuthError {
    /// Taxonomy bucket used to pick the response status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingField(_) | AuthError::InvalidField { .. } => ErrorKind::Validation,
            AuthError::UnknownEmail
            | AuthError::InvalidPassword
            | AuthError::NoCredential
            | AuthError::InvalidCredential(_) => ErrorKind::Unauthorized,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken | AuthError::UsernameTaken => ErrorKind::Conflict,
            AuthError::Database(_)
            | AuthError::HashingFailed
            | AuthError::JwtError(_)
            | AuthError::MissingSecret => ErrorKind::Upstream,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT signing errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::JwtError(_) | AuthError::MissingSecret => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
