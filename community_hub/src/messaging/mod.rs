//! Direct messages and two-party chats.
//!
//! The caller is always the sender, and only participants can read a chat or
//! post to it. Only a message's receiver can mark it read.

pub mod errors;
pub mod models;

pub use errors::{MessagingError, MessagingResult};
pub use models::{
    Chat, ChatId, ChatMessage, DirectMessage, MessageId, MessageStatus, NewDirectMessage,
    OpenChat, PostChatMessage, SendMessage,
};

use std::sync::Arc;

use crate::{
    auth::UserId,
    db::{ChatRepository, MessageRepository, UserRepository},
};

/// Messaging manager
#[derive(Clone)]
pub struct MessagingManager {
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
    chats: Arc<dyn ChatRepository>,
}

impl MessagingManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        messages: Arc<dyn MessageRepository>,
        chats: Arc<dyn ChatRepository>,
    ) -> Self {
        Self {
            users,
            messages,
            chats,
        }
    }

    async fn ensure_user(&self, user_id: UserId) -> MessagingResult<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(MessagingError::UserNotFound(user_id)),
        }
    }

    /// Send a direct message from `subject`
    ///
    /// # Errors
    ///
    /// * `MessagingError::MissingField` - No receiver, or neither text nor attachments
    /// * `MessagingError::UserNotFound` - Receiver does not exist
    pub async fn send_message(
        &self,
        subject: UserId,
        request: SendMessage,
    ) -> MessagingResult<DirectMessage> {
        let receiver = request
            .receiver
            .ok_or(MessagingError::MissingField("Receiver is required"))?;

        let text = request
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let attachments: Vec<String> = request
            .attachments
            .into_iter()
            .filter(|a| !a.trim().is_empty())
            .collect();
        if text.is_none() && attachments.is_empty() {
            return Err(MessagingError::MissingField(
                "Message text or attachment required",
            ));
        }

        self.ensure_user(receiver).await?;

        self.messages
            .insert_message(NewDirectMessage {
                sender: subject,
                receiver,
                text,
                attachments,
            })
            .await
    }

    /// Messages between `subject` and `other`, oldest first
    pub async fn conversation(
        &self,
        subject: UserId,
        other: UserId,
    ) -> MessagingResult<Vec<DirectMessage>> {
        self.messages.conversation(subject, other).await
    }

    /// Mark a message read on behalf of its receiver
    ///
    /// # Errors
    ///
    /// * `MessagingError::MessageNotFound` - No such message
    /// * `MessagingError::Forbidden` - `subject` is not the receiver; nothing changes
    pub async fn mark_read(
        &self,
        subject: UserId,
        message_id: MessageId,
    ) -> MessagingResult<DirectMessage> {
        let message = self
            .messages
            .find_message(message_id)
            .await?
            .ok_or(MessagingError::MessageNotFound(message_id))?;

        if message.receiver != subject {
            log::warn!(
                "User {} tried to mark message {} addressed to {} as read",
                subject,
                message_id,
                message.receiver
            );
            return Err(MessagingError::Forbidden("Not authorized to mark as read"));
        }

        self.messages
            .mark_read(message_id, subject)
            .await?
            .ok_or(MessagingError::MessageNotFound(message_id))
    }

    /// Find or create the chat between `subject` and `other`
    pub async fn open_chat(&self, subject: UserId, other: Option<UserId>) -> MessagingResult<Chat> {
        let other = other.ok_or(MessagingError::MissingField("userId is required"))?;
        self.ensure_user(other).await?;

        let pair = Chat::pair(subject, other);
        if let Some(chat) = self.chats.find_chat(pair).await? {
            return Ok(chat);
        }

        match self.chats.create_chat(pair).await {
            Ok(chat) => {
                log::debug!("Opened chat {} between {} and {}", chat.id, pair[0], pair[1]);
                Ok(chat)
            }
            // The other side opened it between our lookup and insert
            Err(MessagingError::ChatExists) => self
                .chats
                .find_chat(pair)
                .await?
                .ok_or(MessagingError::ChatExists),
            Err(e) => Err(e),
        }
    }

    /// The existing chat between `subject` and `other`
    pub async fn find_chat(&self, subject: UserId, other: UserId) -> MessagingResult<Chat> {
        let pair = Chat::pair(subject, other);
        self.chats
            .find_chat(pair)
            .await?
            .ok_or(MessagingError::NoChatWith(other))
    }

    async fn participant_chat(&self, subject: UserId, chat_id: ChatId) -> MessagingResult<Chat> {
        let chat = self
            .chats
            .find_chat_by_id(chat_id)
            .await?
            .ok_or(MessagingError::ChatNotFound(chat_id))?;

        if !chat.includes(subject) {
            log::warn!("User {} is not a participant of chat {}", subject, chat_id);
            return Err(MessagingError::Forbidden("Not a participant of this chat"));
        }
        Ok(chat)
    }

    /// Post into a chat `subject` participates in
    pub async fn post_to_chat(
        &self,
        subject: UserId,
        request: PostChatMessage,
    ) -> MessagingResult<ChatMessage> {
        let chat_id = request
            .chat_id
            .ok_or(MessagingError::MissingField("chatId and message are required."))?;
        let message = request.message.trim();
        if message.is_empty() {
            return Err(MessagingError::MissingField(
                "chatId and message are required.",
            ));
        }

        self.participant_chat(subject, chat_id).await?;
        self.chats
            .insert_chat_message(chat_id, subject, message)
            .await
    }

    /// Messages in a chat `subject` participates in, oldest first
    pub async fn chat_history(
        &self,
        subject: UserId,
        chat_id: ChatId,
    ) -> MessagingResult<Vec<ChatMessage>> {
        self.participant_chat(subject, chat_id).await?;
        self.chats.chat_messages(chat_id).await
    }
}
