use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapse_db::Database;
use lapse_storage::{Storage, StorageError};
use lapse_types::models::{MessageStatus, Post};
use uuid::Uuid;

use crate::error::BlobError;
use crate::store::{BlobStore, MessageStore, PostDeleteBatch, PostStore};

/// Record store backed by the SQLite database.
///
/// rusqlite is blocking, so every call is moved off the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run a blocking database call on the blocking thread pool.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn set_message_status(
        &self,
        chat_room_id: &str,
        message_id: Uuid,
        status: MessageStatus,
    ) -> Result<bool> {
        let chat_room_id = chat_room_id.to_string();
        self.blocking(move |db| {
            db.update_message_status(&chat_room_id, &message_id.to_string(), &status)
        })
        .await
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn expired_posts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>> {
        let rows = self.blocking(move |db| db.posts_older_than(cutoff)).await?;
        rows.into_iter().map(|row| row.into_post()).collect()
    }

    async fn commit_deletes(&self, batch: PostDeleteBatch) -> Result<usize> {
        let ids: Vec<String> = batch.ids().iter().map(Uuid::to_string).collect();
        self.blocking(move |db| db.delete_posts(&ids)).await
    }
}

#[async_trait]
impl BlobStore for Storage {
    async fn delete_blob(&self, path: &str) -> Result<(), BlobError> {
        self.delete(path).await.map_err(|e| match e {
            StorageError::NotFound(path) => BlobError::NotFound(path),
            other => BlobError::Other(other.into()),
        })
    }
}
