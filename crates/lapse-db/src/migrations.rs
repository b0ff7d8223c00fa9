use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Database: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE messages (
                chat_room_id    TEXT NOT NULL,
                id              TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'sent',
                body            TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                PRIMARY KEY (chat_room_id, id)
            );

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                timestamp       TEXT NOT NULL,
                media_url       TEXT
            );

            CREATE INDEX idx_posts_timestamp ON posts(timestamp);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    if version < 2 {
        info!("Database: running migration v2 (nanosecond timestamps)");
        // `2024-01-01T00:00:00.123Z` becomes `2024-01-01T00:00:00.123000000Z`.
        conn.execute_batch(
            "
            UPDATE posts SET timestamp = substr(timestamp, 1, 23) || '000000Z'
                WHERE length(timestamp) = 24;
            UPDATE messages SET created_at = substr(created_at, 1, 23) || '000000Z'
                WHERE length(created_at) = 24;

            INSERT INTO schema_version (version) VALUES (2);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
