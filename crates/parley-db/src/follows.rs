use anyhow::Result;
use rusqlite::Connection;

use crate::Database;

impl Database {
    /// Add a follow edge. Returns `false` if it already existed.
    pub fn follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO follows (follower_id, followee_id) VALUES (?1, ?2)
                 ON CONFLICT(follower_id, followee_id) DO NOTHING",
                (follower_id, followee_id),
            )?;
            Ok(inserted > 0)
        })
    }

    /// Remove a follow edge. Returns `false` if there was none.
    pub fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                (follower_id, followee_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)",
                (follower_id, followee_id),
                |row| row.get(0),
            )?;
            Ok(found != 0)
        })
    }
}

/// Both directed edges exist.
pub fn is_mutual(conn: &Connection, user_a: i64, user_b: i64) -> Result<bool> {
    let edges: i64 = conn.query_row(
        "SELECT COUNT(*) FROM follows
         WHERE (follower_id = ?1 AND followee_id = ?2)
            OR (follower_id = ?2 AND followee_id = ?1)",
        (user_a, user_b),
        |row| row.get(0),
    )?;
    Ok(edges == 2)
}
