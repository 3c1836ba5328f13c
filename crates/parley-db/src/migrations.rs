use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, follows, notifications)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                nickname    TEXT,
                avatar      TEXT,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            -- A row is an active follow edge; unfollowing deletes it.
            CREATE TABLE follows (
                follower_id INTEGER NOT NULL REFERENCES users(id),
                followee_id INTEGER NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id != followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            CREATE TABLE notifications (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                receiver_id INTEGER NOT NULL REFERENCES users(id),
                actor_id    INTEGER NOT NULL REFERENCES users(id),
                kind        TEXT NOT NULL,
                message     TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_notifications_receiver
                ON notifications(receiver_id, kind, actor_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (direct messaging)");
        conn.execute_batch(
            "
            CREATE TABLE chat_emojis (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                code        TEXT NOT NULL UNIQUE,
                image_url   TEXT NOT NULL,
                category    TEXT NOT NULL DEFAULT 'default',
                sort_order  INTEGER NOT NULL DEFAULT 0,
                is_active   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            -- One row per unordered user pair: the smaller id is always user_a.
            CREATE TABLE chat_conversations (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                user_a_id            INTEGER NOT NULL REFERENCES users(id),
                user_b_id            INTEGER NOT NULL REFERENCES users(id),
                last_message_id      INTEGER,
                last_message_preview TEXT,
                last_message_type    TEXT,
                last_message_at      TEXT,
                unread_count_a       INTEGER NOT NULL DEFAULT 0,
                unread_count_b       INTEGER NOT NULL DEFAULT 0,
                deleted_by_a         INTEGER NOT NULL DEFAULT 0,
                deleted_by_b         INTEGER NOT NULL DEFAULT 0,
                created_at           TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at           TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE (user_a_id, user_b_id),
                CHECK (user_a_id < user_b_id)
            );

            CREATE INDEX idx_conversations_user_a
                ON chat_conversations(user_a_id, last_message_at);
            CREATE INDEX idx_conversations_user_b
                ON chat_conversations(user_b_id, last_message_at);

            CREATE TABLE chat_messages (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id     INTEGER NOT NULL REFERENCES chat_conversations(id),
                sender_id           INTEGER NOT NULL REFERENCES users(id),
                receiver_id         INTEGER NOT NULL REFERENCES users(id),
                message_type        TEXT NOT NULL CHECK (message_type IN ('text', 'image', 'emoji')),
                content             TEXT,
                images              TEXT,
                emoji_id            INTEGER REFERENCES chat_emojis(id),
                is_read             INTEGER NOT NULL DEFAULT 0,
                read_at             TEXT,
                deleted_by_sender   INTEGER NOT NULL DEFAULT 0,
                deleted_by_receiver INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_messages_conversation
                ON chat_messages(conversation_id, created_at);
            CREATE INDEX idx_messages_unread
                ON chat_messages(conversation_id, receiver_id, is_read);

            -- Directional counter, only touched for pairs that do not follow each other.
            CREATE TABLE chat_daily_limits (
                sender_id     INTEGER NOT NULL REFERENCES users(id),
                receiver_id   INTEGER NOT NULL REFERENCES users(id),
                date          TEXT NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (sender_id, receiver_id, date)
            );

            INSERT INTO chat_emojis (name, code, image_url, category, sort_order) VALUES
                ('Smile',    'smile',    '/static/emoji/smile.png',    'default', 1),
                ('Laugh',    'laugh',    '/static/emoji/laugh.png',    'default', 2),
                ('Heart',    'heart',    '/static/emoji/heart.png',    'default', 3),
                ('Thumbs up','thumbs_up','/static/emoji/thumbs_up.png','default', 4),
                ('Cry',      'cry',      '/static/emoji/cry.png',      'default', 5),
                ('Surprised','surprised','/static/emoji/surprised.png','default', 6);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
