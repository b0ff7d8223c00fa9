use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob path: {0:?}")]
    InvalidPath(String),

    #[error("blob storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// On-disk blob store.
///
/// A blob lives at `{storage_dir}/{path}`, where `path` is a relative,
/// `/`-separated name such as `images/abc.jpg`. Anything that could escape the
/// storage directory is rejected before touching the filesystem.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Filesystem location of a blob.
    pub fn blob_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_path(path)?;
        Ok(self.dir.join(path))
    }

    /// Write a blob, replacing any previous content. Returns the size written.
    pub async fn put(&self, path: &str, data: &[u8]) -> Result<u64, StorageError> {
        let target = self.blob_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, data).await?;
        debug!("Stored blob {} ({} bytes)", path, data.len());
        Ok(data.len() as u64)
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.blob_path(path)?;
        fs::read(&target).await.map_err(|e| not_found_or_io(path, e))
    }

    pub async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.blob_path(path)?;
        Ok(fs::try_exists(&target).await?)
    }

    /// Delete a blob. A blob that is not there is reported as `NotFound`.
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.blob_path(path)?;
        fs::remove_file(&target)
            .await
            .map_err(|e| not_found_or_io(path, e))?;
        info!("Deleted blob {}", path);
        Ok(())
    }
}

fn not_found_or_io(path: &str, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(err)
    }
}

fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = || StorageError::InvalidPath(path.to_string());

    if path.is_empty() || path.contains('\\') || path.contains('\0') {
        return Err(invalid());
    }
    if path.split('/').any(|segment| segment.is_empty()) {
        return Err(invalid());
    }
    for component in Path::new(path).components() {
        if !matches!(component, Component::Normal(_)) {
            return Err(invalid());
        }
    }
    Ok(())
}
