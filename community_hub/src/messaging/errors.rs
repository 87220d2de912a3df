//! Messaging error types.

use thiserror::Error;

use super::models::{ChatId, MessageId};
use crate::{
    ErrorKind,
    auth::{AuthError, UserId},
};

/// Messaging errors
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// User lookup failed
    #[error(transparent)]
    Users(#[from] AuthError),

    /// Required field missing from the request
    #[error("{0}")]
    MissingField(&'static str),

    /// Recipient or counterpart does not exist
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Message not found
    #[error("Message not found")]
    MessageNotFound(MessageId),

    /// Chat not found
    #[error("Chat not found")]
    ChatNotFound(ChatId),

    /// No chat exists yet with this user
    #[error("Chat not found")]
    NoChatWith(UserId),

    /// A chat for this pair already exists
    #[error("Chat already exists")]
    ChatExists,

    /// Caller is not allowed to touch this resource
    #[error("{0}")]
    Forbidden(&'static str),
}

impl MessagingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MessagingError::Database(_) => ErrorKind::Upstream,
            MessagingError::Users(e) => e.kind(),
            MessagingError::MissingField(_) => ErrorKind::Validation,
            MessagingError::UserNotFound(_)
            | MessagingError::MessageNotFound(_)
            | MessagingError::ChatNotFound(_)
            | MessagingError::NoChatWith(_) => ErrorKind::NotFound,
            MessagingError::ChatExists => ErrorKind::Conflict,
            MessagingError::Forbidden(_) => ErrorKind::Forbidden,
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            MessagingError::Database(_) => "Internal server error".to_string(),
            MessagingError::Users(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;
