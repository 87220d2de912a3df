//! Direct message and chat data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::auth::UserId;

pub type MessageId = Uuid;
pub type ChatId = Uuid;

/// Delivery state of a direct message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "read" => Ok(MessageStatus::Read),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

/// One message from `sender` to `receiver`
///
/// Only the receiver may mark it read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    pub text: Option<String>,
    pub attachments: Vec<String>,
    pub status: MessageStatus,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a direct message
#[derive(Debug, Clone)]
pub struct NewDirectMessage {
    pub sender: UserId,
    pub receiver: UserId,
    pub text: Option<String>,
    pub attachments: Vec<String>,
}

/// Body of a send request; the sender is always the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMessage {
    pub receiver: Option<UserId>,
    pub text: Option<String>,
    pub attachments: Vec<String>,
}

/// Two-party conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,
    pub participants: [UserId; 2],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Canonical participant order, so either side finds the same chat.
    pub fn pair(a: UserId, b: UserId) -> [UserId; 2] {
        if a <= b { [a, b] } else { [b, a] }
    }

    pub fn includes(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }
}

/// A message posted into a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Body of an open-chat request; the other participant is the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenChat {
    pub user_id: Option<UserId>,
}

/// Body of a chat post; the sender is always the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostChatMessage {
    pub chat_id: Option<ChatId>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Chat::pair(a, b), Chat::pair(b, a));
        let [first, second] = Chat::pair(a, b);
        assert!(first <= second);
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [MessageStatus::Sent, MessageStatus::Read] {
            assert_eq!(status.as_str().parse::<MessageStatus>(), Ok(status));
        }
        assert!("delivered".parse::<MessageStatus>().is_err());
    }
}
