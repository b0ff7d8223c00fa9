//! In-memory store doubles for handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapse_types::models::{Message, MessageStatus, Post};
use uuid::Uuid;

use crate::error::BlobError;
use crate::store::{BlobStore, MessageStore, PostDeleteBatch, PostStore};

#[derive(Default)]
pub struct MemoryMessages {
    statuses: Mutex<HashMap<(String, Uuid), MessageStatus>>,
    writes: Mutex<usize>,
    fail: bool,
}

impl MemoryMessages {
    pub fn with(messages: &[&Message]) -> Self {
        let statuses = messages
            .iter()
            .map(|m| ((m.chat_room_id.clone(), m.id), m.status.clone()))
            .collect();
        Self {
            statuses: Mutex::new(statuses),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn status_of(&self, message: &Message) -> Option<MessageStatus> {
        self.statuses
            .lock()
            .unwrap()
            .get(&(message.chat_room_id.clone(), message.id))
            .cloned()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl MessageStore for MemoryMessages {
    async fn set_message_status(
        &self,
        chat_room_id: &str,
        message_id: Uuid,
        status: MessageStatus,
    ) -> Result<bool> {
        if self.fail {
            bail!("store unavailable");
        }
        *self.writes.lock().unwrap() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.get_mut(&(chat_room_id.to_string(), message_id)) {
            Some(current) => {
                *current = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryPosts {
    posts: Mutex<Vec<Post>>,
    commits: Mutex<Vec<Vec<Uuid>>>,
    queries: Mutex<Vec<DateTime<Utc>>>,
    fail_commit: bool,
}

impl MemoryPosts {
    pub fn with(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    pub fn rejecting_commits(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            fail_commit: true,
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> Vec<Uuid> {
        self.posts.lock().unwrap().iter().map(|p| p.id).collect()
    }

    pub fn commits(&self) -> Vec<Vec<Uuid>> {
        self.commits.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<DateTime<Utc>> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostStore for MemoryPosts {
    async fn expired_posts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>> {
        self.queries.lock().unwrap().push(cutoff);
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.timestamp < cutoff)
            .cloned()
            .collect())
    }

    async fn commit_deletes(&self, batch: PostDeleteBatch) -> Result<usize> {
        if self.fail_commit {
            bail!("batch rejected");
        }
        let ids = batch.into_ids();
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| !ids.contains(&p.id));
        let deleted = before - posts.len();
        self.commits.lock().unwrap().push(ids);
        Ok(deleted)
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    blobs: Mutex<HashSet<String>>,
    broken: HashSet<String>,
    attempts: Mutex<Vec<String>>,
}

impl MemoryBlobs {
    pub fn with(paths: &[&str]) -> Self {
        Self {
            blobs: Mutex::new(paths.iter().map(|p| p.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Deleting any of `paths` fails with a backend error.
    pub fn breaking(mut self, paths: &[&str]) -> Self {
        self.broken = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains(path)
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn delete_blob(&self, path: &str) -> Result<(), BlobError> {
        self.attempts.lock().unwrap().push(path.to_string());
        if self.broken.contains(path) {
            return Err(BlobError::Other(anyhow::anyhow!("permission denied")));
        }
        if self.blobs.lock().unwrap().remove(path) {
            Ok(())
        } else {
            Err(BlobError::NotFound(path.to_string()))
        }
    }
}
