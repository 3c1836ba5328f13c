use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display fields of a user, attached to conversations and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Nickname when set, username otherwise.
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref() {
            Some(nick) if !nick.is_empty() => nick,
            _ => &self.username,
        }
    }
}

/// Which column pair of a conversation belongs to a participant.
/// `A` is always the smaller user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn of(user_id: i64, user_a_id: i64, user_b_id: i64) -> Option<Side> {
        if user_id == user_a_id {
            Some(Side::A)
        } else if user_id == user_b_id {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Emoji,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Emoji => "emoji",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "emoji" => Ok(MessageType::Emoji),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Validated message payload. Exactly one kind of content per message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Image(Vec<ImageInfo>),
    Emoji(i64),
}

impl MessageBody {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageBody::Text(_) => MessageType::Text,
            MessageBody::Image(_) => MessageType::Image,
            MessageBody::Emoji(_) => MessageType::Emoji,
        }
    }

    /// Short text shown in conversation lists and notifications.
    pub fn preview(&self) -> String {
        match self {
            MessageBody::Text(text) => text.clone(),
            MessageBody::Image(_) => "[image]".to_string(),
            MessageBody::Emoji(_) => "[emoji]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_a_id: i64,
    pub user_b_id: i64,
    pub user_a: UserProfile,
    pub user_b: UserProfile,
    pub last_message_id: Option<i64>,
    pub last_message_preview: Option<String>,
    pub last_message_type: Option<MessageType>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count_a: i64,
    pub unread_count_b: i64,
    pub deleted_by_a: bool,
    pub deleted_by_b: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn side_of(&self, user_id: i64) -> Option<Side> {
        Side::of(user_id, self.user_a_id, self.user_b_id)
    }

    pub fn user(&self, side: Side) -> &UserProfile {
        match side {
            Side::A => &self.user_a,
            Side::B => &self.user_b,
        }
    }

    pub fn unread_count(&self, side: Side) -> i64 {
        match side {
            Side::A => self.unread_count_a,
            Side::B => self.unread_count_b,
        }
    }

    pub fn deleted_by(&self, side: Side) -> bool {
        match side {
            Side::A => self.deleted_by_a,
            Side::B => self.deleted_by_b,
        }
    }
}

/// A conversation as seen by one participant: the counterpart's profile and
/// the viewer's own unread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: UserProfile,
    pub unread_count: i64,
}

impl ConversationView {
    /// `None` when `viewer_id` is not a participant.
    pub fn for_viewer(conversation: Conversation, viewer_id: i64) -> Option<Self> {
        let side = conversation.side_of(viewer_id)?;
        Some(Self {
            other_user: conversation.user(side.other()).clone(),
            unread_count: conversation.unread_count(side),
            conversation,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji_id: Option<i64>,
    /// The catalogue entry for emoji messages, so clients can draw it directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Emoji>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub is_deleted_by_sender: bool,
    pub is_deleted_by_receiver: bool,
    pub sender: UserProfile,
    pub receiver: UserProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Whether `user_id` can still see this message on their own side.
    pub fn visible_to(&self, user_id: i64) -> bool {
        (user_id == self.sender_id && !self.is_deleted_by_sender)
            || (user_id == self.receiver_id && !self.is_deleted_by_receiver)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emoji {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub image_url: String,
    pub category: String,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub receiver_id: i64,
    pub actor_id: i64,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of the pre-flight send check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
    pub can_send: bool,
    pub mutual_follow: bool,
    pub message_count: u32,
    pub daily_limit: u32,
}
