//! In-process object store.
//!
//! Keeps a write log that records, for every put/copy, whether the real
//! service would have fired its processing trigger. Used for dry runs and
//! for asserting the anti-recursion property in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage::ObjectStore;

/// How an object came to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Put,
    Copy,
}

/// One entry of the write log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub kind: WriteKind,
    pub bucket: String,
    pub key: String,
    /// Source key for copies.
    pub source: Option<String>,
    /// Whether this write would fire the storage trigger.
    pub triggered: bool,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<(String, String), Vec<u8>>,
    writes: Vec<WriteRecord>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    trigger_excluded: Vec<String>,
}

impl MemoryStore {
    /// Store where every write fires the trigger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose trigger ignores writes under any of `prefixes`.
    pub fn with_trigger_excluded<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Mutex::new(Inner::default()),
            trigger_excluded: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Seed an object without logging a write.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let mut inner = self.lock();
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// Whether an object exists.
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Snapshot of an object's contents.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in a bucket, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Every logged put/copy, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    /// Writes that would have fired the storage trigger.
    pub fn triggered_writes(&self) -> Vec<WriteRecord> {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.triggered)
            .cloned()
            .collect()
    }

    fn fires_trigger(&self, key: &str) -> bool {
        !self.trigger_excluded.iter().any(|p| key.starts_with(p))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.object(bucket, key)
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let triggered = self.fires_trigger(key);
        let mut inner = self.lock();
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
        inner.writes.push(WriteRecord {
            kind: WriteKind::Put,
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: None,
            triggered,
        });
        Ok(())
    }

    async fn copy(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StorageError> {
        let triggered = self.fires_trigger(dest_key);
        let mut inner = self.lock();
        let body = inner
            .objects
            .get(&(bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: source_key.to_string(),
            })?;
        inner
            .objects
            .insert((bucket.to_string(), dest_key.to_string()), body);
        inner.writes.push(WriteRecord {
            kind: WriteKind::Copy,
            bucket: bucket.to_string(),
            key: dest_key.to_string(),
            source: Some(source_key.to_string()),
            triggered,
        });
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        // Deleting a missing key succeeds, like the real service.
        self.lock()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
