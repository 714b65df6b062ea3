//! artarchive MCP server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use artarchive_core::{
    AppConfig, Archive, ArtifactBackend, ArtifactStore, Artifacts, MemoryArtifactStore, SlideDb, TemplateRenderer,
};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        backend = %config.artifact_backend,
        bucket = %config.bucket,
        "Starting artarchive server on stdio transport"
    );

    let db = SlideDb::open(&config.db_path).await?;
    let artifacts = Artifacts::new(artifact_store(&config).await?, config.key_layout());
    let mut archive = Archive::new(db, artifacts);
    if config.render_enabled {
        archive = archive.with_renderer(Arc::new(TemplateRenderer));
    }

    let handler = handler::ArtArchiveServer::new(archive, config.pipeline_config())?;
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

async fn artifact_store(config: &AppConfig) -> Result<Arc<dyn ArtifactStore>> {
    match config.artifact_backend {
        ArtifactBackend::Memory => Ok(Arc::new(MemoryArtifactStore::new())),
        #[cfg(feature = "s3")]
        ArtifactBackend::S3 => {
            let options = artarchive_client::S3Options::from(config);
            Ok(Arc::new(artarchive_client::S3ArtifactStore::connect(&options).await))
        }
        #[cfg(not(feature = "s3"))]
        ArtifactBackend::S3 => anyhow::bail!("artifact backend s3 requires the `s3` feature"),
    }
}
