use serde::{Deserialize, Serialize};

use crate::models::{Message, Notification};

/// Events pushed over the websocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: i64, username: String },

    /// A direct message was delivered to the receiving user
    MessageCreate { message: Box<Message> },

    /// A notification row was created for the receiving user
    NotificationCreate { notification: Notification },

    /// Message notifications from `actor_id` were withdrawn
    NotificationsRetracted { receiver_id: i64, actor_id: i64 },
}

impl GatewayEvent {
    /// The user this event is addressed to. Every gateway event is private.
    pub fn recipient(&self) -> i64 {
        match self {
            Self::Ready { user_id, .. } => *user_id,
            Self::MessageCreate { message } => message.receiver_id,
            Self::NotificationCreate { notification } => notification.receiver_id,
            Self::NotificationsRetracted { receiver_id, .. } => *receiver_id,
        }
    }
}

/// Commands sent FROM client TO server over the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the websocket connection
    Identify { token: String },
}
