use anyhow::Result;
use parley_types::models::Notification;
use rusqlite::{Connection, params};

use crate::{Database, parse_timestamp};

/// Notification kind written for direct messages.
pub const KIND_MESSAGE: &str = "message";

impl Database {
    pub fn list_notifications(&self, receiver_id: i64, limit: u32, offset: u64) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, receiver_id, actor_id, kind, message, is_read, created_at
                 FROM notifications
                 WHERE receiver_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![receiver_id, limit, offset as i64], row_to_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_notifications(&self, receiver_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE receiver_id = ?1",
                [receiver_id],
                |row| row.get(0),
            )?;
            Ok(total as u64)
        })
    }
}

pub fn insert(
    conn: &Connection,
    receiver_id: i64,
    actor_id: i64,
    kind: &str,
    message: &str,
) -> Result<Notification> {
    let created = conn.query_row(
        "INSERT INTO notifications (receiver_id, actor_id, kind, message)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, receiver_id, actor_id, kind, message, is_read, created_at",
        params![receiver_id, actor_id, kind, message],
        row_to_notification,
    )?;
    Ok(created)
}

/// Remove every notification of `kind` sent to `receiver_id` by `actor_id`.
pub fn delete_from_actor(conn: &Connection, receiver_id: i64, actor_id: i64, kind: &str) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM notifications WHERE receiver_id = ?1 AND actor_id = ?2 AND kind = ?3",
        params![receiver_id, actor_id, kind],
    )?;
    Ok(removed)
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        receiver_id: row.get(1)?,
        actor_id: row.get(2)?,
        kind: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
    })
}
