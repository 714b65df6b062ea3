//! S3 artifact store.
//!
//! Objects are written whole with `PutObject` and read with `GetObject`.
//! `NoSuchKey` is the only response treated as "absent"; every other failure
//! (credentials, network, throttling) surfaces as
//! `Error::ArtifactStoreUnavailable` so a caller never mistakes an outage for
//! a cache miss.

use artarchive_core::{AppConfig, ArtifactKey, ArtifactStore, Error};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

/// Connection settings for [`S3ArtifactStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Options {
    /// Region override; the AWS default chain applies when unset.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services. Enables path-style
    /// addressing.
    pub endpoint: Option<String>,
}

impl From<&AppConfig> for S3Options {
    fn from(config: &AppConfig) -> Self {
        Self { region: config.s3_region.clone(), endpoint: config.s3_endpoint.clone() }
    }
}

/// Artifact store backed by an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: Client,
}

impl S3ArtifactStore {
    /// Wrap an already configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the AWS environment plus `options`.
    pub async fn connect(options: &S3Options) -> Self {
        let region = RegionProviderChain::first_try(options.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));
        let shared = aws_config::defaults(BehaviorVersion::latest()).region(region).load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &options.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            region = ?shared.region().map(|r| r.as_ref().to_string()),
            endpoint = ?options.endpoint,
            "S3 artifact store initialized"
        );
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), Error> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&key.bucket)
            .key(&key.key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 PUT failed");
                Error::ArtifactStoreUnavailable(format!("put {key}: {e}"))
            })?;

        tracing::debug!(key = %key, size, "S3 PUT");
        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, Error> {
        let output = match self.client.get_object().bucket(&key.bucket).key(&key.key).send().await {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    tracing::debug!(key = %key, "S3 object not found");
                    return Ok(None);
                }
                tracing::error!(key = %key, error = ?e, "S3 GET failed");
                return Err(Error::ArtifactStoreUnavailable(format!("get {key}: {e}")));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| Error::ArtifactStoreUnavailable(format!("read body of {key}: {e}")))?;

        Ok(Some(body.into_bytes()))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artarchive_core::{KeyLayout, RenderKind};

    #[test]
    fn test_options_from_config() {
        let config = AppConfig {
            s3_region: Some("eu-west-1".into()),
            s3_endpoint: Some("http://localhost:9000".into()),
            ..Default::default()
        };
        let options = S3Options::from(&config);
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert_eq!(options.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    /// Needs a reachable S3-compatible endpoint in `ARTARCHIVE_TEST_S3_ENDPOINT`
    /// and a bucket in `ARTARCHIVE_TEST_BUCKET`.
    #[tokio::test]
    #[ignore]
    async fn test_put_get_roundtrip_live() {
        let endpoint = std::env::var("ARTARCHIVE_TEST_S3_ENDPOINT").unwrap();
        let bucket = std::env::var("ARTARCHIVE_TEST_BUCKET").unwrap();
        let store = S3ArtifactStore::connect(&S3Options { region: None, endpoint: Some(endpoint) }).await;

        let layout = KeyLayout::new(bucket, "test");
        let key = ArtifactKey::derive(&layout, "abc123", RenderKind::Blog, "t1").unwrap();
        store.put(&key, Bytes::from_static(b"<figure/>")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some(&b"<figure/>"[..]));

        let missing = ArtifactKey::derive(&layout, "abc123", RenderKind::Blog, "absent").unwrap();
        assert!(store.get(&missing).await.unwrap().is_none());
    }
}
