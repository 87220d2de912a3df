//! Repository trait definitions for testability and dependency injection.
//!
//! Managers hold these as `Arc<dyn ...>` so the same logic runs against
//! PostgreSQL in production and [`super::MemoryStore`] in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    auth::{AuthResult, Credentials, NewUser, User, UserId},
    feed::{FeedResult, Post, PostId, Story, StoryId},
    messaging::{
        Chat, ChatId, ChatMessage, DirectMessage, MessageId, MessagingResult, NewDirectMessage,
    },
    users::ProfileChanges,
};

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user; `EmailTaken` if the email is already registered
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find a user together with its password digest
    async fn find_credentials(&self, email: &str) -> AuthResult<Option<Credentials>>;

    /// Find every user in `ids`; unknown ids are skipped
    async fn find_many(&self, ids: &[UserId]) -> AuthResult<Vec<User>>;

    /// All users, oldest first
    async fn list_users(&self) -> AuthResult<Vec<User>>;

    /// Apply the present fields of `changes`; `UsernameTaken` on a clash
    async fn update_profile(
        &self,
        user_id: UserId,
        changes: &ProfileChanges,
    ) -> AuthResult<Option<User>>;
}

/// Trait for direct message repository operations
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert_message(&self, message: NewDirectMessage) -> MessagingResult<DirectMessage>;

    async fn find_message(&self, message_id: MessageId) -> MessagingResult<Option<DirectMessage>>;

    /// Messages exchanged between `a` and `b` in either direction, oldest first
    async fn conversation(&self, a: UserId, b: UserId) -> MessagingResult<Vec<DirectMessage>>;

    /// Mark read, but only if `receiver` is the message's receiver
    ///
    /// Returns `None` when no message matches both.
    async fn mark_read(
        &self,
        message_id: MessageId,
        receiver: UserId,
    ) -> MessagingResult<Option<DirectMessage>>;
}

/// Trait for chat repository operations
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find the chat for a sorted participant pair
    async fn find_chat(&self, pair: [UserId; 2]) -> MessagingResult<Option<Chat>>;

    async fn find_chat_by_id(&self, chat_id: ChatId) -> MessagingResult<Option<Chat>>;

    /// Create a chat; `ChatExists` if one already exists for the pair
    async fn create_chat(&self, pair: [UserId; 2]) -> MessagingResult<Chat>;

    /// Append a message and bump the chat's `updated_at`
    async fn insert_chat_message(
        &self,
        chat_id: ChatId,
        sender: UserId,
        message: &str,
    ) -> MessagingResult<ChatMessage>;

    /// Messages in a chat, oldest first
    async fn chat_messages(&self, chat_id: ChatId) -> MessagingResult<Vec<ChatMessage>>;
}

/// Trait for post repository operations
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: &Post) -> FeedResult<()>;

    async fn find_post(&self, post_id: PostId) -> FeedResult<Option<Post>>;

    /// All posts, newest first
    async fn list_posts(&self) -> FeedResult<Vec<Post>>;

    /// Posts owning at least one of the given CDN file ids
    async fn posts_with_media(&self, file_ids: &[String]) -> FeedResult<Vec<Post>>;
}

/// Trait for story repository operations
#[async_trait]
pub trait StoryRepository: Send + Sync {
    async fn insert_story(&self, story: &Story) -> FeedResult<()>;

    async fn find_story(&self, story_id: StoryId) -> FeedResult<Option<Story>>;

    /// Stories created at or after `cutoff`, newest first
    async fn stories_since(&self, cutoff: DateTime<Utc>) -> FeedResult<Vec<Story>>;
}
