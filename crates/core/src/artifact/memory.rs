//! In-process artifact store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ArtifactKey, ArtifactStore};
use crate::Error;

/// Artifact store kept in memory, one map per bucket.
///
/// Used by tests and by local runs configured with the `memory` backend.
/// It can be switched offline to exercise the unavailable path.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    buckets: RwLock<HashMap<String, HashMap<String, Bytes>>>,
    offline: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `ArtifactStoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of objects stored across all buckets.
    pub async fn len(&self) -> usize {
        self.buckets.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> Result<(), Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::ArtifactStoreUnavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), Error> {
        self.check_online()?;
        self.buckets
            .write()
            .await
            .entry(key.bucket.clone())
            .or_default()
            .insert(key.key.clone(), bytes);
        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, Error> {
        self.check_online()?;
        Ok(self
            .buckets
            .read()
            .await
            .get(&key.bucket)
            .and_then(|bucket| bucket.get(&key.key))
            .cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
