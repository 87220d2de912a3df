//! # Community Hub
//!
//! Core library for the Community-Hub social backend: accounts and sessions,
//! user profiles, direct messages and chats, and a media feed of posts and
//! stories backed by an image CDN.
//!
//! ## Architecture
//!
//! Every component talks to storage through the repository traits in [`db`],
//! so the same managers run against PostgreSQL in production and against the
//! in-memory store in tests and local development.
//!
//! - [`auth`]: password hashing, signed session tokens, register/login/Google
//!   login and the request-time authentication check
//! - [`users`]: profile updates and onboarding
//! - [`messaging`]: direct messages and two-party chats
//! - [`feed`]: posts and stories with CDN-hosted media
//! - [`media`]: the CDN client
//! - [`mail`]: outbound mail
//!
//! Any operation that mutates a per-user resource takes the authenticated
//! subject as an explicit [`auth::UserId`] argument. There is no way to act on
//! behalf of a user by naming them in a request body.
//!
//! ## Example
//!
//! ```
//! use community_hub::auth::TokenCodec;
//! use uuid::Uuid;
//!
//! let codec = TokenCodec::new("a-secret-that-is-long-enough-for-tests").unwrap();
//! let subject = Uuid::new_v4();
//! let token = codec.issue(subject).unwrap();
//! assert_eq!(codec.verify(&token).unwrap(), subject);
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod feed;
pub mod mail;
pub mod media;
pub mod messaging;
pub mod users;

pub use error::ErrorKind;
