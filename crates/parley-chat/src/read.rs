use parley_db::messages::{self, Participant};
use parley_db::{conversations, now_timestamp};
use parley_types::api::MAX_PAGE_SIZE;
use parley_types::models::Message;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::service::{ChatService, page_offset};

impl ChatService {
    /// Mark everything addressed to `user_id` in the conversation as read and
    /// zero their unread counter. The other side's counter is untouched.
    pub fn mark_conversation_read(&self, conversation_id: i64, user_id: i64) -> Result<usize> {
        let marked = self.db.with_tx(|tx| {
            let conv = conversations::find_by_id(tx, conversation_id)?
                .ok_or(ChatError::NotFoundOrForbidden)?;
            let side = conv.side_of(user_id).ok_or(ChatError::NotFoundOrForbidden)?;

            let now = now_timestamp();
            let marked = messages::mark_read(tx, conv.id, user_id, &now)?;
            conversations::reset_unread(tx, conv.id, side, &now)?;
            Ok::<_, ChatError>(marked)
        })?;

        debug!(conversation_id, user_id, marked, "Conversation read");
        Ok(marked)
    }

    /// One page of the messages `user_id` can see, oldest first within the
    /// page. Page 1 holds the newest messages.
    pub fn list_messages(
        &self,
        conversation_id: i64,
        user_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Message>, u64)> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, limit);

        let (mut rows, total) = self.db.with_conn(|conn| {
            let Some(conv) = conversations::find_by_id(conn, conversation_id)? else {
                return Ok(None);
            };
            if conv.side_of(user_id).is_none() {
                return Ok(None);
            }
            let rows = messages::list_visible_newest_first(conn, conv.id, user_id, limit, offset)?;
            let total = messages::count_visible(conn, conv.id, user_id)?;
            Ok(Some((rows, total)))
        })?
        .ok_or(ChatError::NotFoundOrForbidden)?;

        rows.reverse();
        Ok((rows, total))
    }

    /// Hide a single message on the caller's side. Unread counters are not
    /// adjusted.
    pub fn delete_message(&self, message_id: i64, user_id: i64) -> Result<()> {
        self.db.with_tx(|tx| {
            let message = messages::find_by_id(tx, message_id)?
                .ok_or(ChatError::NotFoundOrForbidden)?;
            let who = Participant::of(&message, user_id).ok_or(ChatError::NotFoundOrForbidden)?;
            messages::mark_deleted(tx, message.id, who, &now_timestamp())?;
            Ok::<_, ChatError>(())
        })?;

        debug!(message_id, user_id, "Message hidden");
        Ok(())
    }
}
