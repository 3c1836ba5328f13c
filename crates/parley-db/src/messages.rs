use anyhow::Result;
use parley_types::models::{ImageInfo, Message, MessageBody, MessageType};
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use crate::emojis::emoji_at;
use crate::users::profile_at;
use crate::{OptionalExt, parse_optional_timestamp, parse_timestamp};

const SELECT_MESSAGE: &str = "
    SELECT m.id, m.conversation_id,
           s.id, s.username, s.nickname, s.avatar,
           r.id, r.username, r.nickname, r.avatar,
           m.message_type, m.content, m.images, m.emoji_id,
           m.is_read, m.read_at, m.deleted_by_sender, m.deleted_by_receiver,
           m.created_at, m.updated_at,
           e.id, e.name, e.code, e.image_url, e.category, e.sort_order, e.is_active, e.created_at
    FROM chat_messages m
    JOIN users s ON s.id = m.sender_id
    JOIN users r ON r.id = m.receiver_id
    LEFT JOIN chat_emojis e ON e.id = m.emoji_id";

/// Visibility rule: each participant sees a message until they delete it on their side.
const VISIBLE_TO_USER: &str = "
    ((m.sender_id = ?2 AND m.deleted_by_sender = 0)
     OR (m.receiver_id = ?2 AND m.deleted_by_receiver = 0))";

/// Which participant of a message is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Sender,
    Receiver,
}

impl Participant {
    pub fn of(message: &Message, user_id: i64) -> Option<Participant> {
        if user_id == message.sender_id {
            Some(Participant::Sender)
        } else if user_id == message.receiver_id {
            Some(Participant::Receiver)
        } else {
            None
        }
    }
}

/// Append a message and return its id. Read state and delete flags start cleared.
pub fn insert(
    conn: &Connection,
    conversation_id: i64,
    sender_id: i64,
    receiver_id: i64,
    body: &MessageBody,
    now: &str,
) -> Result<i64> {
    let (content, images, emoji_id) = match body {
        MessageBody::Text(text) => (Some(text.as_str()), None, None),
        MessageBody::Image(list) => (None, Some(serde_json::to_string(list)?), None),
        MessageBody::Emoji(id) => (None, None, Some(*id)),
    };

    conn.execute(
        "INSERT INTO chat_messages
            (conversation_id, sender_id, receiver_id, message_type, content, images, emoji_id,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            conversation_id,
            sender_id,
            receiver_id,
            body.message_type().as_str(),
            content,
            images,
            emoji_id,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Message>> {
    let sql = format!("{} WHERE m.id = ?1", SELECT_MESSAGE);
    conn.query_row(&sql, [id], row_to_message).optional()
}

/// One page of the messages `viewer_id` can see, NEWEST first.
/// Callers that display chronologically reverse the page themselves.
pub fn list_visible_newest_first(
    conn: &Connection,
    conversation_id: i64,
    viewer_id: i64,
    limit: u32,
    offset: u64,
) -> Result<Vec<Message>> {
    let sql = format!(
        "{} WHERE m.conversation_id = ?1 AND {}
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ?3 OFFSET ?4",
        SELECT_MESSAGE, VISIBLE_TO_USER
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![conversation_id, viewer_id, limit, offset as i64],
            row_to_message,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_visible(conn: &Connection, conversation_id: i64, viewer_id: i64) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM chat_messages m WHERE m.conversation_id = ?1 AND {}",
        VISIBLE_TO_USER
    );
    let total: i64 = conn.query_row(&sql, (conversation_id, viewer_id), |row| row.get(0))?;
    Ok(total as u64)
}

/// Mark every unread message addressed to `reader_id` as read. Returns how many changed.
pub fn mark_read(conn: &Connection, conversation_id: i64, reader_id: i64, now: &str) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE chat_messages
         SET is_read = 1, read_at = ?3, updated_at = ?3
         WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
        params![conversation_id, reader_id, now],
    )?;
    Ok(changed)
}

/// Hide a message for one participant. Returns `true` if the flag changed.
pub fn mark_deleted(conn: &Connection, id: i64, who: Participant, now: &str) -> Result<bool> {
    let sql = match who {
        Participant::Sender => {
            "UPDATE chat_messages SET deleted_by_sender = 1, updated_at = ?2
             WHERE id = ?1 AND deleted_by_sender = 0"
        }
        Participant::Receiver => {
            "UPDATE chat_messages SET deleted_by_receiver = 1, updated_at = ?2
             WHERE id = ?1 AND deleted_by_receiver = 0"
        }
    };
    let changed = conn.execute(sql, params![id, now])?;
    Ok(changed > 0)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let sender = profile_at(row, 2)?;
    let receiver = profile_at(row, 6)?;

    let message_type = row
        .get::<_, String>(10)?
        .parse::<MessageType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, e.into()))?;

    let images = row
        .get::<_, Option<String>>(12)?
        .map(|raw| {
            serde_json::from_str::<Vec<ImageInfo>>(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))
        })
        .transpose()?;

    let emoji = match row.get::<_, Option<i64>>(20)? {
        Some(_) => Some(emoji_at(row, 20)?),
        None => None,
    };

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: sender.id,
        receiver_id: receiver.id,
        message_type,
        content: row.get(11)?,
        images,
        emoji_id: row.get(13)?,
        emoji,
        is_read: row.get(14)?,
        read_at: parse_optional_timestamp(15, row.get(15)?)?,
        is_deleted_by_sender: row.get(16)?,
        is_deleted_by_receiver: row.get(17)?,
        sender,
        receiver,
        created_at: parse_timestamp(18, &row.get::<_, String>(18)?)?,
        updated_at: parse_timestamp(19, &row.get::<_, String>(19)?)?,
    })
}
