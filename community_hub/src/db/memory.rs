//! In-process implementation of every repository trait.
//!
//! Used by the test suites and by the server's `--memory` mode. All tables sit
//! behind one lock, so each check-then-write (duplicate email, username or
//! chat pair) happens inside a single write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{
    ChatRepository, MessageRepository, PostRepository, StoryRepository, UserRepository,
};
use crate::{
    auth::{AuthError, AuthResult, Credentials, NewUser, User, UserId},
    feed::{FeedResult, Post, PostId, Story, StoryId},
    messaging::{
        Chat, ChatId, ChatMessage, DirectMessage, MessageId, MessageStatus, MessagingError,
        MessagingResult, NewDirectMessage,
    },
    users::ProfileChanges,
};

#[derive(Default)]
struct Tables {
    users: Vec<Credentials>,
    messages: Vec<DirectMessage>,
    chats: HashMap<ChatId, Chat>,
    chat_messages: Vec<ChatMessage>,
    posts: Vec<Post>,
    stories: Vec<Story>,
}

/// Repository backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_changes(user: &mut User, changes: &ProfileChanges) {
    if let Some(username) = &changes.username {
        user.username = Some(username.clone());
    }
    if let Some(bio) = &changes.bio {
        user.bio = bio.clone();
    }
    if let Some(gender) = changes.gender {
        user.gender = gender;
    }
    if let Some(dob) = changes.dob {
        user.dob = Some(dob);
    }
    if let Some(location) = &changes.location {
        user.location = location.clone();
    }
    if let Some(website) = &changes.website {
        user.website = website.clone();
    }
    if let Some(interests) = &changes.interests {
        user.interests = interests.clone();
    }
    if let Some(profession) = &changes.profession {
        user.profession = profession.clone();
    }
    if let Some(cover_image) = &changes.cover_image {
        user.cover_image = cover_image.clone();
    }
    if let Some(social_links) = &changes.social_links {
        user.social_links = social_links.clone();
    }
    user.updated_at = Utc::now();
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|c| c.user.email == new_user.email) {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            avatar: new_user.avatar,
            username: None,
            bio: String::new(),
            gender: Default::default(),
            dob: None,
            location: String::new(),
            website: String::new(),
            interests: Vec::new(),
            profession: String::new(),
            cover_image: String::new(),
            social_links: Default::default(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(Credentials {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });
        Ok(user)
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|c| c.user.email == email)
            .map(|c| c.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> AuthResult<Option<Credentials>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|c| c.user.email == email).cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> AuthResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|c| ids.contains(&c.user.id))
            .map(|c| c.user.clone())
            .collect())
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().map(|c| c.user.clone()).collect())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        changes: &ProfileChanges,
    ) -> AuthResult<Option<User>> {
        let mut tables = self.tables.write().await;

        if let Some(username) = &changes.username {
            let taken = tables
                .users
                .iter()
                .any(|c| c.user.id != user_id && c.user.username.as_ref() == Some(username));
            if taken {
                return Err(AuthError::UsernameTaken);
            }
        }

        let Some(entry) = tables.users.iter_mut().find(|c| c.user.id == user_id) else {
            return Ok(None);
        };
        apply_changes(&mut entry.user, changes);
        Ok(Some(entry.user.clone()))
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn insert_message(&self, message: NewDirectMessage) -> MessagingResult<DirectMessage> {
        let now = Utc::now();
        let message = DirectMessage {
            id: Uuid::new_v4(),
            sender: message.sender,
            receiver: message.receiver,
            text: message.text,
            attachments: message.attachments,
            status: MessageStatus::Sent,
            is_read: false,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn find_message(&self, message_id: MessageId) -> MessagingResult<Option<DirectMessage>> {
        let tables = self.tables.read().await;
        Ok(tables.messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn conversation(&self, a: UserId, b: UserId) -> MessagingResult<Vec<DirectMessage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| {
                (m.sender == a && m.receiver == b) || (m.sender == b && m.receiver == a)
            })
            .cloned()
            .collect())
    }

    async fn mark_read(
        &self,
        message_id: MessageId,
        receiver: UserId,
    ) -> MessagingResult<Option<DirectMessage>> {
        let mut tables = self.tables.write().await;
        let Some(message) = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.receiver == receiver)
        else {
            return Ok(None);
        };

        message.status = MessageStatus::Read;
        message.is_read = true;
        message.updated_at = Utc::now();
        Ok(Some(message.clone()))
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn find_chat(&self, pair: [UserId; 2]) -> MessagingResult<Option<Chat>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chats
            .values()
            .find(|c| c.participants == pair)
            .cloned())
    }

    async fn find_chat_by_id(&self, chat_id: ChatId) -> MessagingResult<Option<Chat>> {
        Ok(self.tables.read().await.chats.get(&chat_id).cloned())
    }

    async fn create_chat(&self, pair: [UserId; 2]) -> MessagingResult<Chat> {
        let mut tables = self.tables.write().await;
        if tables.chats.values().any(|c| c.participants == pair) {
            return Err(MessagingError::ChatExists);
        }

        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            participants: pair,
            created_at: now,
            updated_at: now,
        };
        tables.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn insert_chat_message(
        &self,
        chat_id: ChatId,
        sender: UserId,
        message: &str,
    ) -> MessagingResult<ChatMessage> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let Some(chat) = tables.chats.get_mut(&chat_id) else {
            return Err(MessagingError::ChatNotFound(chat_id));
        };
        chat.updated_at = now;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender,
            message: message.to_string(),
            created_at: now,
        };
        tables.chat_messages.push(message.clone());
        Ok(message)
    }

    async fn chat_messages(&self, chat_id: ChatId) -> MessagingResult<Vec<ChatMessage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: &Post) -> FeedResult<()> {
        self.tables.write().await.posts.push(post.clone());
        Ok(())
    }

    async fn find_post(&self, post_id: PostId) -> FeedResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn list_posts(&self) -> FeedResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().rev().cloned().collect())
    }

    async fn posts_with_media(&self, file_ids: &[String]) -> FeedResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.media.iter().any(|m| file_ids.contains(&m.file_id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoryRepository for MemoryStore {
    async fn insert_story(&self, story: &Story) -> FeedResult<()> {
        self.tables.write().await.stories.push(story.clone());
        Ok(())
    }

    async fn find_story(&self, story_id: StoryId) -> FeedResult<Option<Story>> {
        let tables = self.tables.read().await;
        Ok(tables.stories.iter().find(|s| s.id == story_id).cloned())
    }

    async fn stories_since(&self, cutoff: DateTime<Utc>) -> FeedResult<Vec<Story>> {
        let tables = self.tables.read().await;
        let mut stories: Vec<Story> = tables
            .stories
            .iter()
            .filter(|s| s.created_at >= cutoff)
            .cloned()
            .collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "digest".to_string(),
            avatar: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.io")).await.unwrap();

        let err = store.create_user(new_user("a@x.io")).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_username_clash_rejected_but_own_name_kept() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user("a@x.io")).await.unwrap();
        let b = store.create_user(new_user("b@x.io")).await.unwrap();

        let claim = ProfileChanges {
            username: Some("neo".to_string()),
            ..Default::default()
        };
        store.update_profile(a.id, &claim).await.unwrap();
        // Re-saving your own username is not a clash
        store.update_profile(a.id, &claim).await.unwrap();

        let err = store.update_profile(b.id, &claim).await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_update_leaves_absent_fields() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.io")).await.unwrap();

        let first = ProfileChanges {
            bio: Some("hello".to_string()),
            location: Some("Pune".to_string()),
            ..Default::default()
        };
        store.update_profile(user.id, &first).await.unwrap();

        let second = ProfileChanges {
            bio: Some("updated".to_string()),
            ..Default::default()
        };
        let updated = store.update_profile(user.id, &second).await.unwrap().unwrap();
        assert_eq!(updated.bio, "updated");
        assert_eq!(updated.location, "Pune");
    }

    #[tokio::test]
    async fn test_mark_read_requires_receiver() {
        let store = MemoryStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let message = store
            .insert_message(NewDirectMessage {
                sender: alice,
                receiver: bob,
                text: Some("hi".to_string()),
                attachments: vec![],
            })
            .await
            .unwrap();

        assert!(store.mark_read(message.id, alice).await.unwrap().is_none());
        let stored = store.find_message(message.id).await.unwrap().unwrap();
        assert!(!stored.is_read);

        let read = store.mark_read(message.id, bob).await.unwrap().unwrap();
        assert!(read.is_read);
        assert_eq!(read.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_chat_pair_unique() {
        let store = MemoryStore::new();
        let pair = Chat::pair(Uuid::new_v4(), Uuid::new_v4());
        store.create_chat(pair).await.unwrap();

        let err = store.create_chat(pair).await.unwrap_err();
        assert!(matches!(err, MessagingError::ChatExists));
    }
}
