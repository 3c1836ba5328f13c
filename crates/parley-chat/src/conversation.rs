use anyhow::anyhow;
use parley_db::{conversations, now_timestamp, users};
use parley_types::api::MAX_PAGE_SIZE;
use parley_types::models::{Conversation, ConversationView};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{ChatError, Result};
use crate::service::{ChatService, page_offset};

impl ChatService {
    /// Find the conversation between `caller_id` and `other_id`, creating it on
    /// first contact. If the caller had hidden it, it reappears for the caller
    /// only.
    pub fn get_or_create_conversation(&self, caller_id: i64, other_id: i64) -> Result<ConversationView> {
        if caller_id == other_id {
            return Err(ChatError::invalid("cannot start a conversation with yourself"));
        }

        let conversation = self
            .db
            .with_tx(|tx| open_conversation(tx, caller_id, other_id, &now_timestamp()))?;

        ConversationView::for_viewer(conversation, caller_id)
            .ok_or_else(|| anyhow!("caller {} missing from own conversation", caller_id).into())
    }

    /// Conversations the user has not hidden, most recent activity first.
    pub fn list_conversations(
        &self,
        user_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<ConversationView>, u64)> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, limit);

        let (rows, total) = self.db.with_conn(|conn| {
            let rows = conversations::list_visible(conn, user_id, limit, offset)?;
            let total = conversations::count_visible(conn, user_id)?;
            Ok((rows, total))
        })?;

        let items = rows
            .into_iter()
            .filter_map(|conv| ConversationView::for_viewer(conv, user_id))
            .collect();
        Ok((items, total))
    }

    /// Hide a conversation for the caller. Messages are kept, and the other
    /// participant's view does not change.
    pub fn delete_conversation(&self, conversation_id: i64, user_id: i64) -> Result<()> {
        let other_id = self.db.with_tx(|tx| {
            let conv = conversations::find_by_id(tx, conversation_id)?
                .ok_or(ChatError::NotFoundOrForbidden)?;
            let side = conv.side_of(user_id).ok_or(ChatError::NotFoundOrForbidden)?;

            conversations::set_deleted(tx, conv.id, side, true, &now_timestamp())?;
            Ok::<_, ChatError>(conv.user(side.other()).id)
        })?;

        info!(conversation_id, user_id, "Conversation hidden");

        if let Err(e) = self.sink.retract_message_notifications(user_id, other_id) {
            warn!(
                "Failed to retract message notifications for {} from {}: {}",
                user_id, other_id, e
            );
        }
        Ok(())
    }
}

/// Get-or-create on an open transaction: canonicalize the pair, insert if
/// absent, and clear the caller's delete flag if set.
pub(crate) fn open_conversation(
    conn: &Connection,
    caller_id: i64,
    other_id: i64,
    now: &str,
) -> Result<Conversation> {
    if !users::user_exists(conn, other_id)? {
        return Err(ChatError::invalid(format!("user {} does not exist", other_id)));
    }

    let (user_a_id, user_b_id) = conversations::canonical_pair(caller_id, other_id);
    if conversations::insert_pair(conn, user_a_id, user_b_id)? {
        info!(user_a_id, user_b_id, "Conversation created");
    }

    let conv = conversations::find_by_pair(conn, user_a_id, user_b_id)?
        .ok_or_else(|| anyhow!("conversation {}:{} missing after insert", user_a_id, user_b_id))?;
    let side = conv
        .side_of(caller_id)
        .ok_or_else(|| anyhow!("caller {} not in conversation {}", caller_id, conv.id))?;

    if !conv.deleted_by(side) {
        return Ok(conv);
    }

    conversations::set_deleted(conn, conv.id, side, false, now)?;
    info!(conversation_id = conv.id, caller_id, "Conversation restored");

    let restored = conversations::find_by_id(conn, conv.id)?
        .ok_or_else(|| anyhow!("conversation {} vanished during restore", conv.id))?;
    Ok(restored)
}
