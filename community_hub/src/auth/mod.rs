//! Authentication module providing registration, login and session checks.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 signed session tokens (7-day expiry) carried in a cookie
//! - Find-or-create login for identities asserted by Google sign-in
//!
//! ## Example
//!
//! ```no_run
//! use community_hub::auth::{AuthManager, PepperedHasher, RegisterRequest, TokenCodec};
//! use community_hub::db::MemoryStore;
//! use community_hub::mail::LogMailer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthManager::new(
//!         Arc::new(MemoryStore::new()),
//!         PepperedHasher::new("secret_pepper"),
//!         TokenCodec::new("a-signing-secret-of-at-least-32-chars")?,
//!         Arc::new(LogMailer::new()),
//!     );
//!
//!     let request = RegisterRequest {
//!         name: "Ann".to_string(),
//!         email: "ann@example.com".to_string(),
//!         password: "SecurePass123".to_string(),
//!     };
//!
//!     let session = auth.register(request).await?;
//!     println!("Registered user: {}", session.user.id);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod token;

pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    Credentials, Gender, GoogleIdentity, LoginRequest, MAX_BIO_LENGTH, NewUser, RegisterRequest,
    Session, SocialLinks, User, UserId, UserSummary,
};
pub use password::{PepperedHasher, generate_password};
pub use token::{SESSION_TTL_DAYS, SessionClaims, TokenCodec, TokenError};
