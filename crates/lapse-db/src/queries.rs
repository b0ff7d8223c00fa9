use crate::models::{MessageRow, PostRow};
use crate::{Database, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use lapse_types::models::{Message, MessageStatus, Post};
use rusqlite::Connection;
use tracing::debug;

impl Database {
    // -- Messages --

    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (chat_room_id, id, status, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    &message.chat_room_id,
                    message.id.to_string(),
                    message.status.as_str(),
                    &message.body,
                    format_timestamp(message.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, chat_room_id: &str, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, chat_room_id, id))
    }

    /// Overwrite a message's status. Returns false when no such message exists.
    pub fn update_message_status(
        &self,
        chat_room_id: &str,
        id: &str,
        status: &MessageStatus,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = ?1 WHERE chat_room_id = ?2 AND id = ?3",
                rusqlite::params![status.as_str(), chat_room_id, id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, timestamp, media_url) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    post.id.to_string(),
                    format_timestamp(post.timestamp),
                    post.media_url.as_deref(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, timestamp, media_url FROM posts WHERE id = ?1")?;
            let row = stmt.query_row([id], post_from_row).optional()?;
            Ok(row)
        })
    }

    /// All posts whose timestamp is strictly before `cutoff`, oldest first.
    pub fn posts_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, media_url FROM posts
                 WHERE timestamp < ?1
                 ORDER BY timestamp ASC",
            )?;
            let rows = stmt
                .query_map([format_timestamp(cutoff)], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a set of posts in a single transaction. Either every row goes or
    /// none does. Returns the number of rows removed.
    pub fn delete_posts(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM posts WHERE id = ?1")?;
                for id in ids {
                    deleted += stmt.execute([id])?;
                }
            }
            tx.commit()?;
            debug!("Deleted {} of {} requested posts", deleted, ids.len());
            Ok(deleted)
        })
    }
}

fn query_message(conn: &Connection, chat_room_id: &str, id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT chat_room_id, id, status, body, created_at FROM messages
         WHERE chat_room_id = ?1 AND id = ?2",
    )?;

    let row = stmt
        .query_row([chat_room_id, id], |row| {
            Ok(MessageRow {
                chat_room_id: row.get(0)?,
                id: row.get(1)?,
                status: row.get(2)?,
                body: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        media_url: row.get(2)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
