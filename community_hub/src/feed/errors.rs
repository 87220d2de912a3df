//! Feed error types.

use thiserror::Error;

use super::models::{PostId, StoryId};
use crate::{ErrorKind, auth::AuthError, media::MediaError};

/// Feed errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// CDN error
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Author lookup failed
    #[error(transparent)]
    Users(#[from] AuthError),

    /// Required field missing from the request
    #[error("{0}")]
    MissingField(&'static str),

    /// Field present but unusable
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Post not found
    #[error("Post not found")]
    PostNotFound(PostId),

    /// Story not found or already expired
    #[error("Story not found")]
    StoryNotFound(StoryId),

    /// CDN has no file with this id
    #[error("File not found")]
    FileNotFound(String),
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Database(_) => ErrorKind::Upstream,
            FeedError::Media(e) => e.kind(),
            FeedError::Users(e) => e.kind(),
            FeedError::MissingField(_) | FeedError::InvalidField { .. } => ErrorKind::Validation,
            FeedError::PostNotFound(_) | FeedError::StoryNotFound(_) | FeedError::FileNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }

    /// Get a client-safe error message
    ///
    /// Store and CDN failures are reported generically; the detail is logged
    /// where the failure happens.
    pub fn client_message(&self) -> String {
        match self {
            FeedError::Database(_) => "Internal server error".to_string(),
            FeedError::Media(MediaError::InvalidData(_)) => self.to_string(),
            FeedError::Media(_) => "Media service unavailable".to_string(),
            FeedError::Users(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;
