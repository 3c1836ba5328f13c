/// Database row types that never leave the DB layer as-is.
/// Shared API models live in parley-types.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub password: String,
    pub created_at: String,
}
