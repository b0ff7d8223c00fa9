use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapse_types::models::{MessageStatus, Post};
use uuid::Uuid;

use crate::error::BlobError;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Overwrite the status of one message. Returns false if the message is gone.
    async fn set_message_status(
        &self,
        chat_room_id: &str,
        message_id: Uuid,
        status: MessageStatus,
    ) -> Result<bool>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Posts with `timestamp < cutoff`.
    async fn expired_posts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>>;

    /// Apply every queued delete at once. All-or-nothing: on error no post
    /// from the batch may have been removed. Returns the number of records
    /// actually deleted.
    async fn commit_deletes(&self, batch: PostDeleteBatch) -> Result<usize>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn delete_blob(&self, path: &str) -> Result<(), BlobError>;
}

/// Post deletes queued up for a single commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PostDeleteBatch {
    ids: Vec<Uuid>,
}

impl PostDeleteBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, post_id: Uuid) {
        self.ids.push(post_id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<Uuid> {
        self.ids
    }
}
