use thiserror::Error;
use uuid::Uuid;

/// A post's `media_url` could not be turned into a blob path.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("malformed media reference {url:?}: {reason}")]
    Malformed { url: String, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Malformed(#[from] MediaError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures that end a handler invocation. Blob failures never show up here;
/// the reaper logs them per post and carries on.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to query expired posts: {0:#}")]
    Query(anyhow::Error),

    #[error("batch delete of {count} posts was rejected: {error:#}")]
    BatchCommit { count: usize, error: anyhow::Error },

    #[error("failed to update status of message {chat_room_id}/{message_id}: {error:#}")]
    StatusUpdate {
        chat_room_id: String,
        message_id: Uuid,
        error: anyhow::Error,
    },
}
