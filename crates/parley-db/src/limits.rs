use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::OptionalExt;

/// Atomically take one message from the `(sender, receiver, day)` allowance.
///
/// Creates the row at 1 on the first message of the day, otherwise increments
/// only while `message_count < cap`. Returns `false` when the cap is reached,
/// in which case nothing was written.
pub fn try_consume(
    conn: &Connection,
    sender_id: i64,
    receiver_id: i64,
    day: NaiveDate,
    cap: u32,
    now: &str,
) -> Result<bool> {
    if cap == 0 {
        return Ok(false);
    }

    let changed = conn.execute(
        "INSERT INTO chat_daily_limits (sender_id, receiver_id, date, message_count, updated_at)
         VALUES (?1, ?2, ?3, 1, ?5)
         ON CONFLICT(sender_id, receiver_id, date) DO UPDATE
             SET message_count = message_count + 1,
                 updated_at = excluded.updated_at
             WHERE chat_daily_limits.message_count < ?4",
        params![sender_id, receiver_id, day.to_string(), cap, now],
    )?;
    Ok(changed > 0)
}

/// Messages already counted against `(sender, receiver, day)`.
pub fn used_on(conn: &Connection, sender_id: i64, receiver_id: i64, day: NaiveDate) -> Result<u32> {
    let count: Option<i64> = conn
        .query_row(
            "SELECT message_count FROM chat_daily_limits
             WHERE sender_id = ?1 AND receiver_id = ?2 AND date = ?3",
            params![sender_id, receiver_id, day.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0).max(0) as u32)
}
