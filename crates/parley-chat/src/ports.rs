use anyhow::Result;
use parley_db::{Database, follows};
use parley_types::models::Message;

/// Social-graph lookup the send gate depends on.
pub trait FollowGraph: Send + Sync {
    /// Both users currently follow each other.
    fn is_mutual(&self, user_a: i64, user_b: i64) -> Result<bool>;
}

impl FollowGraph for Database {
    fn is_mutual(&self, user_a: i64, user_b: i64) -> Result<bool> {
        self.with_conn(|conn| follows::is_mutual(conn, user_a, user_b))
    }
}

/// Where new-message events go once a send has committed.
///
/// Every call is best-effort: the chat core logs failures and carries on.
pub trait NotificationSink: Send + Sync {
    fn notify_new_message(&self, message: &Message, preview: &str) -> Result<()>;

    /// Drop pending message notifications sent to `receiver_id` by `from_actor_id`.
    fn retract_message_notifications(&self, receiver_id: i64, from_actor_id: i64) -> Result<()>;
}
