use anyhow::Result;
use parley_types::models::{Conversation, MessageType, Side};
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use crate::users::profile_at;
use crate::{OptionalExt, parse_optional_timestamp, parse_timestamp};

const SELECT_CONVERSATION: &str = "
    SELECT c.id,
           ua.id, ua.username, ua.nickname, ua.avatar,
           ub.id, ub.username, ub.nickname, ub.avatar,
           c.last_message_id, c.last_message_preview, c.last_message_type, c.last_message_at,
           c.unread_count_a, c.unread_count_b, c.deleted_by_a, c.deleted_by_b,
           c.created_at, c.updated_at
    FROM chat_conversations c
    JOIN users ua ON ua.id = c.user_a_id
    JOIN users ub ON ub.id = c.user_b_id";

/// Column name for a per-side field, e.g. `("unread_count", Side::B)` -> `unread_count_b`.
fn side_column(stem: &str, side: Side) -> String {
    match side {
        Side::A => format!("{}_a", stem),
        Side::B => format!("{}_b", stem),
    }
}

/// Order a pair so the smaller id comes first.
pub fn canonical_pair(u1: i64, u2: i64) -> (i64, i64) {
    if u1 < u2 { (u1, u2) } else { (u2, u1) }
}

/// Insert a zeroed row for the canonical pair unless one exists.
/// Returns `true` when a row was created.
pub fn insert_pair(conn: &Connection, user_a_id: i64, user_b_id: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO chat_conversations (user_a_id, user_b_id) VALUES (?1, ?2)
         ON CONFLICT(user_a_id, user_b_id) DO NOTHING",
        (user_a_id, user_b_id),
    )?;
    Ok(inserted > 0)
}

pub fn find_by_pair(conn: &Connection, user_a_id: i64, user_b_id: i64) -> Result<Option<Conversation>> {
    let sql = format!("{} WHERE c.user_a_id = ?1 AND c.user_b_id = ?2", SELECT_CONVERSATION);
    conn.query_row(&sql, (user_a_id, user_b_id), row_to_conversation)
        .optional()
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Conversation>> {
    let sql = format!("{} WHERE c.id = ?1", SELECT_CONVERSATION);
    conn.query_row(&sql, [id], row_to_conversation).optional()
}

/// Set one side's delete flag. Returns `true` if the flag changed.
pub fn set_deleted(conn: &Connection, id: i64, side: Side, deleted: bool, now: &str) -> Result<bool> {
    let col = side_column("deleted_by", side);
    let sql = format!(
        "UPDATE chat_conversations SET {col} = ?2, updated_at = ?3 WHERE id = ?1 AND {col} != ?2"
    );
    let changed = conn.execute(&sql, params![id, deleted, now])?;
    Ok(changed > 0)
}

/// Store the last-message summary and bump the receiver's unread counter
/// in a single statement.
pub fn record_message(
    conn: &Connection,
    id: i64,
    message_id: i64,
    preview: &str,
    message_type: MessageType,
    receiver_side: Side,
    now: &str,
) -> Result<()> {
    let unread = side_column("unread_count", receiver_side);
    let sql = format!(
        "UPDATE chat_conversations
         SET last_message_id = ?2,
             last_message_preview = ?3,
             last_message_type = ?4,
             last_message_at = ?5,
             {unread} = {unread} + 1,
             updated_at = ?5
         WHERE id = ?1"
    );
    let changed = conn.execute(
        &sql,
        params![id, message_id, preview, message_type.as_str(), now],
    )?;
    if changed != 1 {
        anyhow::bail!("conversation {} vanished while recording message {}", id, message_id);
    }
    Ok(())
}

pub fn reset_unread(conn: &Connection, id: i64, side: Side, now: &str) -> Result<()> {
    let col = side_column("unread_count", side);
    let sql = format!("UPDATE chat_conversations SET {col} = 0, updated_at = ?2 WHERE id = ?1");
    conn.execute(&sql, params![id, now])?;
    Ok(())
}

const VISIBLE_TO_USER: &str = "
    ((c.user_a_id = ?1 AND c.deleted_by_a = 0) OR (c.user_b_id = ?1 AND c.deleted_by_b = 0))";

/// Conversations `user_id` takes part in and has not hidden, most recent first.
pub fn list_visible(conn: &Connection, user_id: i64, limit: u32, offset: u64) -> Result<Vec<Conversation>> {
    let sql = format!(
        "{} WHERE {}
         ORDER BY c.last_message_at IS NULL, c.last_message_at DESC, c.id DESC
         LIMIT ?2 OFFSET ?3",
        SELECT_CONVERSATION, VISIBLE_TO_USER
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, limit, offset as i64], row_to_conversation)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_visible(conn: &Connection, user_id: i64) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM chat_conversations c WHERE {}", VISIBLE_TO_USER);
    let total: i64 = conn.query_row(&sql, [user_id], |row| row.get(0))?;
    Ok(total as u64)
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let user_a = profile_at(row, 1)?;
    let user_b = profile_at(row, 5)?;

    let last_message_type = row
        .get::<_, Option<String>>(11)?
        .map(|raw| {
            raw.parse::<MessageType>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(11, Type::Text, e.into())
            })
        })
        .transpose()?;

    Ok(Conversation {
        id: row.get(0)?,
        user_a_id: user_a.id,
        user_b_id: user_b.id,
        user_a,
        user_b,
        last_message_id: row.get(9)?,
        last_message_preview: row.get(10)?,
        last_message_type,
        last_message_at: parse_optional_timestamp(12, row.get(12)?)?,
        unread_count_a: row.get(13)?,
        unread_count_b: row.get(14)?,
        deleted_by_a: row.get(15)?,
        deleted_by_b: row.get(16)?,
        created_at: parse_timestamp(17, &row.get::<_, String>(17)?)?,
        updated_at: parse_timestamp(18, &row.get::<_, String>(18)?)?,
    })
}
