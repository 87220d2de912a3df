//! PostgreSQL implementations of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use super::repository::{
    ChatRepository, MessageRepository, PostRepository, StoryRepository, UserRepository,
};
use crate::{
    auth::{AuthError, AuthResult, Credentials, NewUser, SocialLinks, User, UserId},
    feed::{FeedResult, MediaRef, Post, PostId, Story, StoryId},
    messaging::{
        Chat, ChatId, ChatMessage, DirectMessage, MessageId, MessagingError, MessagingResult,
        NewDirectMessage,
    },
    users::ProfileChanges,
};

const USER_COLUMNS: &str = "id, name, email, avatar, username, bio, gender, dob, location, \
     website, interests, profession, cover_image, social_links, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, text, attachments, status, is_read, created_at, updated_at";

const CHAT_COLUMNS: &str = "id, participant_a, participant_b, created_at, updated_at";

const POST_COLUMNS: &str =
    "id, author_id, caption, visibility, media, tags, is_edited, created_at, updated_at";

const STORY_COLUMNS: &str = "id, author_id, caption, visibility, media, created_at, updated_at";

/// Whether `err` is a unique violation of `constraint`.
fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        avatar: row.try_get("avatar")?,
        username: row.try_get("username")?,
        bio: row.try_get("bio")?,
        gender: row
            .try_get::<String, _>("gender")?
            .parse()
            .unwrap_or_default(),
        dob: row.try_get("dob")?,
        location: row.try_get("location")?,
        website: row.try_get("website")?,
        interests: row.try_get("interests")?,
        profession: row.try_get("profession")?,
        cover_image: row.try_get("cover_image")?,
        social_links: row.try_get::<Json<SocialLinks>, _>("social_links")?.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<DirectMessage, sqlx::Error> {
    Ok(DirectMessage {
        id: row.try_get("id")?,
        sender: row.try_get("sender_id")?,
        receiver: row.try_get("receiver_id")?,
        text: row.try_get("text")?,
        attachments: row.try_get("attachments")?,
        status: row
            .try_get::<String, _>("status")?
            .parse()
            .unwrap_or_default(),
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn chat_from_row(row: &PgRow) -> Result<Chat, sqlx::Error> {
    Ok(Chat {
        id: row.try_get("id")?,
        participants: [row.try_get("participant_a")?, row.try_get("participant_b")?],
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn chat_message_from_row(row: &PgRow) -> Result<ChatMessage, sqlx::Error> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        sender: row.try_get("sender_id")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        author: row.try_get("author_id")?,
        caption: row.try_get("caption")?,
        visibility: row
            .try_get::<String, _>("visibility")?
            .parse()
            .unwrap_or_default(),
        media: row.try_get::<Json<Vec<MediaRef>>, _>("media")?.0,
        tags: row.try_get("tags")?,
        is_edited: row.try_get("is_edited")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn story_from_row(row: &PgRow) -> Result<Story, sqlx::Error> {
    Ok(Story {
        id: row.try_get("id")?,
        author: row.try_get("author_id")?,
        caption: row.try_get("caption")?,
        visibility: row
            .try_get::<String, _>("visibility")?
            .parse()
            .unwrap_or_default(),
        media: row.try_get::<Json<Vec<MediaRef>>, _>("media")?.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, avatar)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.avatar)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if violates(&e, "users_email_key") {
                    AuthError::EmailTaken
                } else {
                    AuthError::Database(e)
                }
            })?;

        Ok(user_from_row(&row)?)
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_credentials(&self, email: &str) -> AuthResult<Option<Credentials>> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(Credentials {
            user: user_from_row(&row)?,
            password_hash: row.try_get("password_hash")?,
        }))
    }

    async fn find_many(&self, ids: &[UserId]) -> AuthResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        changes: &ProfileChanges,
    ) -> AuthResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET
                username     = COALESCE($2, username),
                bio          = COALESCE($3, bio),
                gender       = COALESCE($4, gender),
                dob          = COALESCE($5, dob),
                location     = COALESCE($6, location),
                website      = COALESCE($7, website),
                interests    = COALESCE($8, interests),
                profession   = COALESCE($9, profession),
                cover_image  = COALESCE($10, cover_image),
                social_links = COALESCE($11, social_links),
                updated_at   = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(changes.username.as_deref())
            .bind(changes.bio.as_deref())
            .bind(changes.gender.map(|g| g.as_str()))
            .bind(changes.dob)
            .bind(changes.location.as_deref())
            .bind(changes.website.as_deref())
            .bind(changes.interests.clone())
            .bind(changes.profession.as_deref())
            .bind(changes.cover_image.as_deref())
            .bind(changes.social_links.clone().map(Json))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if violates(&e, "users_username_key") {
                    AuthError::UsernameTaken
                } else {
                    AuthError::Database(e)
                }
            })?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

/// PostgreSQL implementation of `MessageRepository`
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert_message(&self, message: NewDirectMessage) -> MessagingResult<DirectMessage> {
        let sql = format!(
            "INSERT INTO direct_messages (id, sender_id, receiver_id, text, attachments)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(message.sender)
            .bind(message.receiver)
            .bind(message.text)
            .bind(message.attachments)
            .fetch_one(&self.pool)
            .await?;

        Ok(message_from_row(&row)?)
    }

    async fn find_message(&self, message_id: MessageId) -> MessagingResult<Option<DirectMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM direct_messages WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(message_from_row).transpose()?)
    }

    async fn conversation(&self, a: UserId, b: UserId) -> MessagingResult<Vec<DirectMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM direct_messages
             WHERE (sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1)
             ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(a)
            .bind(b)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn mark_read(
        &self,
        message_id: MessageId,
        receiver: UserId,
    ) -> MessagingResult<Option<DirectMessage>> {
        let sql = format!(
            "UPDATE direct_messages
             SET status = 'read', is_read = TRUE, updated_at = NOW()
             WHERE id = $1 AND receiver_id = $2
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(message_id)
            .bind(receiver)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(message_from_row).transpose()?)
    }
}

/// PostgreSQL implementation of `ChatRepository`
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_chat(&self, pair: [UserId; 2]) -> MessagingResult<Option<Chat>> {
        let sql = format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE participant_a = $1 AND participant_b = $2"
        );
        let row = sqlx::query(&sql)
            .bind(pair[0])
            .bind(pair[1])
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(chat_from_row).transpose()?)
    }

    async fn find_chat_by_id(&self, chat_id: ChatId) -> MessagingResult<Option<Chat>> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(chat_from_row).transpose()?)
    }

    async fn create_chat(&self, pair: [UserId; 2]) -> MessagingResult<Chat> {
        let sql = format!(
            "INSERT INTO chats (id, participant_a, participant_b)
             VALUES ($1, $2, $3)
             RETURNING {CHAT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(pair[0])
            .bind(pair[1])
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if violates(&e, "chats_pair_key") {
                    MessagingError::ChatExists
                } else {
                    MessagingError::Database(e)
                }
            })?;

        Ok(chat_from_row(&row)?)
    }

    async fn insert_chat_message(
        &self,
        chat_id: ChatId,
        sender: UserId,
        message: &str,
    ) -> MessagingResult<ChatMessage> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO chat_messages (id, chat_id, sender_id, message)
             VALUES ($1, $2, $3, $4)
             RETURNING id, chat_id, sender_id, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(sender)
        .bind(message)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(chat_message_from_row(&row)?)
    }

    async fn chat_messages(&self, chat_id: ChatId) -> MessagingResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender_id, message, created_at
             FROM chat_messages WHERE chat_id = $1 ORDER BY created_at",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(chat_message_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// PostgreSQL implementation of `PostRepository`
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert_post(&self, post: &Post) -> FeedResult<()> {
        sqlx::query(
            "INSERT INTO posts
                (id, author_id, caption, visibility, media, tags, is_edited, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(post.id)
        .bind(post.author)
        .bind(post.caption.as_deref())
        .bind(post.visibility.as_str())
        .bind(Json(&post.media))
        .bind(&post.tags)
        .bind(post.is_edited)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_post(&self, post_id: PostId) -> FeedResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn list_posts(&self) -> FeedResult<Vec<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn posts_with_media(&self, file_ids: &[String]) -> FeedResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE EXISTS (
                 SELECT 1 FROM jsonb_array_elements(media) AS m
                 WHERE m ->> 'fileId' = ANY($1)
             )"
        );
        let rows = sqlx::query(&sql)
            .bind(file_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// PostgreSQL implementation of `StoryRepository`
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn insert_story(&self, story: &Story) -> FeedResult<()> {
        sqlx::query(
            "INSERT INTO stories
                (id, author_id, caption, visibility, media, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(story.id)
        .bind(story.author)
        .bind(story.caption.as_deref())
        .bind(story.visibility.as_str())
        .bind(Json(&story.media))
        .bind(story.created_at)
        .bind(story.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_story(&self, story_id: StoryId) -> FeedResult<Option<Story>> {
        let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(story_from_row).transpose()?)
    }

    async fn stories_since(&self, cutoff: DateTime<Utc>) -> FeedResult<Vec<Story>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE created_at >= $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(story_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
