use anyhow::Result;
use parley_types::models::UserProfile;
use rusqlite::Connection;

use crate::models::UserRow;
use crate::{Database, OptionalExt};

impl Database {
    /// Insert a user and return its id.
    pub fn create_user(
        &self,
        username: &str,
        nickname: Option<&str>,
        password_hash: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, nickname, password) VALUES (?1, ?2, ?3)",
                (username, nickname, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, nickname, avatar, password, created_at
                 FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        nickname: row.get(2)?,
                        avatar: row.get(3)?,
                        password: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_profile(&self, id: i64) -> Result<Option<UserProfile>> {
        self.with_conn(|conn| query_profile(conn, id))
    }
}

pub fn query_profile(conn: &Connection, id: i64) -> Result<Option<UserProfile>> {
    conn.query_row(
        "SELECT id, username, nickname, avatar FROM users WHERE id = ?1",
        [id],
        |row| {
            Ok(UserProfile {
                id: row.get(0)?,
                username: row.get(1)?,
                nickname: row.get(2)?,
                avatar: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn user_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(found != 0)
}

/// Reads the profile columns `start..start+4` as written by the
/// `u.id, u.username, u.nickname, u.avatar` projections used in joins.
pub(crate) fn profile_at(row: &rusqlite::Row<'_>, start: usize) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(start)?,
        username: row.get(start + 1)?,
        nickname: row.get(start + 2)?,
        avatar: row.get(start + 3)?,
    })
}
