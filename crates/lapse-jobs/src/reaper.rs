use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BlobError, JobError};
use crate::media::blob_path_from_url;
use crate::store::{BlobStore, PostDeleteBatch, PostStore};

pub const DEFAULT_RETENTION_HOURS: i64 = 24;
pub const DEFAULT_BLOB_DELETE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Posts older than this are expired.
    pub retention: Duration,
    /// How many blob deletions may be in flight at once.
    pub blob_delete_concurrency: usize,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
            blob_delete_concurrency: DEFAULT_BLOB_DELETE_CONCURRENCY,
        }
    }
}

/// What a single reaper run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapReport {
    pub cutoff: DateTime<Utc>,
    pub expired: usize,
    pub blobs_deleted: usize,
    pub blob_failures: usize,
    pub records_deleted: usize,
}

impl ReapReport {
    fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            expired: 0,
            blobs_deleted: 0,
            blob_failures: 0,
            records_deleted: 0,
        }
    }
}

/// Delete every post older than the retention window, media first.
///
/// The cutoff is computed once from `now`. Each expired post's blob is deleted
/// (failures are logged and counted, never fatal), then all expired posts go
/// in one batch commit. A rejected commit fails the whole run.
pub async fn reap_expired_posts<P, B>(
    posts: &P,
    blobs: &B,
    now: DateTime<Utc>,
    config: &ReaperConfig,
) -> Result<ReapReport, JobError>
where
    P: PostStore + ?Sized,
    B: BlobStore + ?Sized,
{
    // A window reaching past the representable range expires nothing.
    let cutoff = now
        .checked_sub_signed(config.retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut report = ReapReport::new(cutoff);

    let expired = posts.expired_posts(cutoff).await.map_err(JobError::Query)?;
    if expired.is_empty() {
        info!("No posts older than {} to delete", cutoff);
        return Ok(report);
    }
    report.expired = expired.len();
    debug!("Found {} posts older than {}", expired.len(), cutoff);

    // Blob deletions run concurrently; only this task touches the batch.
    let outcomes: Vec<(Uuid, Option<Result<String, BlobError>>)> = stream::iter(expired)
        .map(|post| async move {
            let media = match post.media_url.as_deref() {
                Some(url) => Some(delete_media(blobs, url).await),
                None => None,
            };
            (post.id, media)
        })
        .buffer_unordered(config.blob_delete_concurrency.max(1))
        .collect()
        .await;

    let mut batch = PostDeleteBatch::with_capacity(outcomes.len());
    for (post_id, media) in outcomes {
        match media {
            Some(Ok(path)) => {
                report.blobs_deleted += 1;
                info!("Deleted media {} of post {}", path, post_id);
            }
            Some(Err(e)) => {
                report.blob_failures += 1;
                warn!("Failed to delete media of post {}: {}", post_id, e);
            }
            None => {}
        }

        info!("Post {} scheduled for deletion", post_id);
        batch.push(post_id);
    }

    let count = batch.len();
    report.records_deleted = posts
        .commit_deletes(batch)
        .await
        .map_err(|error| JobError::BatchCommit { count, error })?;

    info!(
        "Expired posts deleted: {} records, {} media blobs, {} media failures",
        report.records_deleted, report.blobs_deleted, report.blob_failures
    );
    Ok(report)
}

async fn delete_media<B>(blobs: &B, url: &str) -> Result<String, BlobError>
where
    B: BlobStore + ?Sized,
{
    let path = blob_path_from_url(url)?;
    blobs.delete_blob(&path).await?;
    Ok(path)
}
