use anyhow::Result;
use parley_types::models::Emoji;
use rusqlite::Connection;

use crate::{Database, parse_timestamp};

impl Database {
    pub fn list_emojis(&self) -> Result<Vec<Emoji>> {
        self.with_conn(list_active)
    }
}

pub fn list_active(conn: &Connection) -> Result<Vec<Emoji>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, code, image_url, category, sort_order, is_active, created_at
         FROM chat_emojis
         WHERE is_active = 1
         ORDER BY sort_order ASC, created_at ASC",
    )?;

    let rows = stmt
        .query_map([], |row| emoji_at(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Map the eight emoji columns starting at `start`.
pub(crate) fn emoji_at(row: &rusqlite::Row<'_>, start: usize) -> rusqlite::Result<Emoji> {
    Ok(Emoji {
        id: row.get(start)?,
        name: row.get(start + 1)?,
        code: row.get(start + 2)?,
        image_url: row.get(start + 3)?,
        category: row.get(start + 4)?,
        sort_order: row.get(start + 5)?,
        is_active: row.get(start + 6)?,
        created_at: parse_timestamp(start + 7, &row.get::<_, String>(start + 7)?)?,
    })
}

pub fn is_active(conn: &Connection, id: i64) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chat_emojis WHERE id = ?1 AND is_active = 1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(found != 0)
}
