//! Rendered artifact storage.
//!
//! Artifacts live in a bucketed object namespace under keys derived purely
//! from `(bucket, version prefix, guid hash, render kind, version)`. Two
//! processes rendering the same slide content compute the same key, so
//! storage deduplicates naturally and overwrites are harmless.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;
use crate::slide::RenderKind;

pub use memory::MemoryArtifactStore;

/// Where artifact keys are rooted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    /// Bucket (namespace) holding every artifact.
    pub bucket: String,
    /// Leading path segment that versions the whole key scheme.
    pub version_prefix: String,
}

impl KeyLayout {
    pub fn new(bucket: impl Into<String>, version_prefix: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), version_prefix: version_prefix.into() }
    }
}

/// Fully-qualified address of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub bucket: String,
    pub key: String,
}

impl ArtifactKey {
    /// Derive the key for a render of a slide.
    ///
    /// The object key is `{version_prefix}/slides/{guid_hash}/{kind}/{version}`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConstraintViolation` if any component is empty or
    /// contains a `/`.
    pub fn derive(layout: &KeyLayout, guid_hash: &str, kind: RenderKind, version: &str) -> Result<Self, Error> {
        let components = [
            ("bucket", layout.bucket.as_str()),
            ("version_prefix", layout.version_prefix.as_str()),
            ("guid_hash", guid_hash),
            ("version", version),
        ];
        for (name, value) in components {
            if value.is_empty() || value.contains('/') {
                return Err(Error::ConstraintViolation(format!(
                    "artifact key component {name} must be non-empty and free of '/': {value:?}"
                )));
            }
        }

        Ok(Self {
            bucket: layout.bucket.clone(),
            key: format!("{}/slides/{guid_hash}/{kind}/{version}", layout.version_prefix),
        })
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Blob store backing the artifact tier.
///
/// Implementations must be safe for concurrent use. `get` returns `Ok(None)`
/// only when the object is known to be absent; transport or service failures
/// are `Error::ArtifactStoreUnavailable`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), Error>;

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, Error>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str {
        "unknown"
    }
}

/// Artifact store adapter addressed by slide identity.
#[derive(Clone)]
pub struct Artifacts {
    store: Arc<dyn ArtifactStore>,
    layout: KeyLayout,
}

impl fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifacts")
            .field("backend", &self.store.backend_name())
            .field("layout", &self.layout)
            .finish()
    }
}

impl Artifacts {
    pub fn new(store: Arc<dyn ArtifactStore>, layout: KeyLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Store the bytes of a render. Overwrites any existing object at the key.
    pub async fn put(&self, guid_hash: &str, kind: RenderKind, version: &str, bytes: Bytes) -> Result<(), Error> {
        let key = ArtifactKey::derive(&self.layout, guid_hash, kind, version)?;
        let size = bytes.len();
        self.store.put(&key, bytes).await?;
        tracing::debug!(key = %key, size, backend = self.store.backend_name(), "stored artifact");
        Ok(())
    }

    /// Fetch the bytes of a render, `None` if it was never stored.
    pub async fn get(&self, guid_hash: &str, kind: RenderKind, version: &str) -> Result<Option<Bytes>, Error> {
        let key = ArtifactKey::derive(&self.layout, guid_hash, kind, version)?;
        self.store.get(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> KeyLayout {
        KeyLayout::new("art-archive", "v1")
    }

    #[test]
    fn test_key_derivation_is_pure() {
        let a = ArtifactKey::derive(&layout(), "abc123", RenderKind::Blog, "t1").unwrap();
        let b = ArtifactKey::derive(&layout(), "abc123", RenderKind::Blog, "t1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bucket, "art-archive");
        assert_eq!(a.key, "v1/slides/abc123/blog/t1");
    }

    #[test]
    fn test_key_varies_by_component() {
        let base = ArtifactKey::derive(&layout(), "abc123", RenderKind::Blog, "t1").unwrap();
        let kind = ArtifactKey::derive(&layout(), "abc123", RenderKind::Slide, "t1").unwrap();
        let version = ArtifactKey::derive(&layout(), "abc123", RenderKind::Blog, "t2").unwrap();
        let prefix = ArtifactKey::derive(&KeyLayout::new("art-archive", "v2"), "abc123", RenderKind::Blog, "t1").unwrap();
        assert_ne!(base, kind);
        assert_ne!(base, version);
        assert_ne!(base, prefix);
    }

    #[test]
    fn test_key_rejects_bad_components() {
        assert!(matches!(
            ArtifactKey::derive(&layout(), "", RenderKind::Blog, "t1"),
            Err(Error::ConstraintViolation(_))
        ));
        assert!(matches!(
            ArtifactKey::derive(&layout(), "a/b", RenderKind::Blog, "t1"),
            Err(Error::ConstraintViolation(_))
        ));
        assert!(matches!(
            ArtifactKey::derive(&KeyLayout::new("", "v1"), "abc", RenderKind::Blog, "t1"),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let artifacts = Artifacts::new(Arc::new(MemoryArtifactStore::new()), layout());
        artifacts.put("abc123", RenderKind::Blog, "t1", Bytes::from_static(b"<figure/>")).await.unwrap();

        let bytes = artifacts.get("abc123", RenderKind::Blog, "t1").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"<figure/>"[..]));
        assert!(artifacts.get("abc123", RenderKind::Blog, "t2").await.unwrap().is_none());
        assert!(artifacts.get("abc123", RenderKind::Slide, "t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let artifacts = Artifacts::new(Arc::new(MemoryArtifactStore::new()), layout());
        artifacts.put("abc123", RenderKind::Blog, "t1", Bytes::from_static(b"one")).await.unwrap();
        artifacts.put("abc123", RenderKind::Blog, "t1", Bytes::from_static(b"two")).await.unwrap();

        let bytes = artifacts.get("abc123", RenderKind::Blog, "t1").await.unwrap().unwrap();
        assert_eq!(&bytes[..], b"two");
    }
}
