use anyhow::Result;
use lapse_types::models::{Message, Post};
use uuid::Uuid;

use crate::parse_timestamp;

/// Database row types — these map directly to SQLite rows.
/// Distinct from lapse-types models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub chat_room_id: String,
    pub id: String,
    pub status: String,
    pub body: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: Uuid::parse_str(&self.id)?,
            chat_room_id: self.chat_room_id,
            status: self.status.into(),
            body: self.body,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub timestamp: String,
    pub media_url: Option<String>,
}

impl PostRow {
    pub fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: Uuid::parse_str(&self.id)?,
            timestamp: parse_timestamp(&self.timestamp)?,
            media_url: self.media_url,
        })
    }
}
