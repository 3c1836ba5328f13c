use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use parley_chat::NotificationSink;
use parley_db::Database;
use parley_db::notifications::{self, KIND_MESSAGE};
use parley_gateway::dispatcher::Dispatcher;
use parley_types::events::GatewayEvent;
use parley_types::models::Message;

/// Longest message excerpt copied into a notification.
const NOTIFICATION_PREVIEW_CHARS: usize = 100;

/// Stores message notifications and pushes them, along with the message
/// itself, to the receiver's open gateway connections.
pub struct Notifier {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl Notifier {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }
}

impl NotificationSink for Notifier {
    fn notify_new_message(&self, message: &Message, preview: &str) -> Result<()> {
        self.dispatcher.publish(GatewayEvent::MessageCreate {
            message: Box::new(message.clone()),
        });

        let text = notification_text(message.sender.display_name(), preview);
        let notification = self.db.with_conn(|conn| {
            notifications::insert(conn, message.receiver_id, message.sender_id, KIND_MESSAGE, &text)
        })?;

        self.dispatcher
            .publish(GatewayEvent::NotificationCreate { notification });
        Ok(())
    }

    fn retract_message_notifications(&self, receiver_id: i64, from_actor_id: i64) -> Result<()> {
        let removed = self.db.with_conn(|conn| {
            notifications::delete_from_actor(conn, receiver_id, from_actor_id, KIND_MESSAGE)
        })?;

        if removed > 0 {
            debug!(receiver_id, from_actor_id, removed, "Message notifications retracted");
            self.dispatcher.publish(GatewayEvent::NotificationsRetracted {
                receiver_id,
                actor_id: from_actor_id,
            });
        }
        Ok(())
    }
}

fn notification_text(display_name: &str, preview: &str) -> String {
    let mut excerpt: String = preview.chars().take(NOTIFICATION_PREVIEW_CHARS).collect();
    if preview.chars().nth(NOTIFICATION_PREVIEW_CHARS).is_some() {
        excerpt.push_str("...");
    }
    format!("{} sent you a message: {}", display_name, excerpt)
}
