//! Filesystem-backed object store.
//!
//! Each bucket is a directory under the root; each key is a relative path
//! inside it. Useful for local runs against a directory tree.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::storage::ObjectStore;

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a bucket/key pair to a path, rejecting anything that escapes the bucket.
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        check_bucket(bucket)?;
        let rel = Path::new(key);
        if key.is_empty() || key.ends_with('/') {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
                reason: "must name an object".into(),
            });
        }
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey {
                        key: key.to_string(),
                        reason: "must be a relative path without '.' or '..'".into(),
                    });
                }
            }
        }
        Ok(self.root.join(bucket).join(rel))
    }
}

fn check_bucket(bucket: &str) -> Result<(), StorageError> {
    if bucket.is_empty() || bucket.contains('/') || bucket == "." || bucket == ".." {
        return Err(StorageError::InvalidKey {
            key: bucket.to_string(),
            reason: "invalid bucket name".into(),
        });
    }
    Ok(())
}

fn io_err(bucket: &str, key: &str, source: std::io::Error) -> StorageError {
    if source.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        StorageError::Io {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        }
    }
}

async fn ensure_parent(path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(bucket, key, e))?;
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(bucket, key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| io_err(bucket, key, e))
    }

    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(bucket, key)?;
        ensure_parent(&path, bucket, key).await?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| io_err(bucket, key, e))?;
        debug!(path = %path.display(), bytes = body.len(), "Wrote object");
        Ok(())
    }

    async fn copy(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StorageError> {
        let source = self.resolve(bucket, source_key)?;
        let dest = self.resolve(bucket, dest_key)?;
        let body = tokio::fs::read(&source)
            .await
            .map_err(|e| io_err(bucket, source_key, e))?;
        ensure_parent(&dest, bucket, dest_key).await?;
        tokio::fs::write(&dest, &body)
            .await
            .map_err(|e| io_err(bucket, dest_key, e))?;
        debug!(from = %source.display(), to = %dest.display(), "Copied object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(bucket, key, e)),
        }
    }
}
