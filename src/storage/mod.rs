//! Object storage gateway.
//!
//! A key/value blob store with get/put/copy/delete. Writes to the real
//! service fire an out-of-band processing trigger for every key outside the
//! reserved temporary prefix, so callers must only `put` under that prefix
//! and use `copy` to materialise anything else.

pub mod fs;
pub mod memory;

use async_trait::async_trait;

use crate::error::StorageError;

pub use fs::FsStore;
pub use memory::{MemoryStore, WriteKind, WriteRecord};

/// Backend-agnostic object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's full contents.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write an object, replacing any existing one.
    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError>;

    /// Server-side copy within one bucket.
    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str)
    -> Result<(), StorageError>;

    /// Remove an object.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}
