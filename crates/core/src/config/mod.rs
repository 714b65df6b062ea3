//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ARTARCHIVE_*)
//! 2. TOML config file (if ARTARCHIVE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::fmt;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::artifact::KeyLayout;
use crate::pipeline::PipelineConfig;

mod validation;

pub use validation::ConfigError;

/// Where rendered artifacts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactBackend {
    /// An S3 (or S3-compatible) bucket.
    S3,
    /// Process memory; artifacts are lost on exit.
    #[default]
    Memory,
}

impl fmt::Display for ArtifactBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::S3 => "s3",
            Self::Memory => "memory",
        })
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ARTARCHIVE_*)
/// 2. TOML config file (if ARTARCHIVE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite slide database.
    ///
    /// Set via ARTARCHIVE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Artifact store backend, `s3` or `memory`.
    ///
    /// Set via ARTARCHIVE_ARTIFACT_BACKEND environment variable.
    #[serde(default)]
    pub artifact_backend: ArtifactBackend,

    /// Bucket holding rendered artifacts.
    ///
    /// Set via ARTARCHIVE_BUCKET environment variable.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Leading segment of every artifact key.
    ///
    /// Set via ARTARCHIVE_VERSION_PREFIX environment variable.
    #[serde(default = "default_version_prefix")]
    pub version_prefix: String,

    /// Custom S3 endpoint, e.g. a local MinIO.
    ///
    /// Set via ARTARCHIVE_S3_ENDPOINT environment variable.
    #[serde(default)]
    pub s3_endpoint: Option<String>,

    /// S3 region; the AWS default chain is used when unset.
    ///
    /// Set via ARTARCHIVE_S3_REGION environment variable.
    #[serde(default)]
    pub s3_region: Option<String>,

    /// Ingestion worker count.
    ///
    /// Set via ARTARCHIVE_WORKERS environment variable.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Bounded queue length per ingestion worker.
    ///
    /// Set via ARTARCHIVE_QUEUE_CAPACITY environment variable.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Bounded length of the ingestion outcome channel.
    ///
    /// Set via ARTARCHIVE_OUTCOME_CAPACITY environment variable.
    #[serde(default = "default_outcome_capacity")]
    pub outcome_capacity: usize,

    /// Whether stale artifacts are rendered on request.
    ///
    /// Set via ARTARCHIVE_RENDER_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub render_enabled: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./artarchive.sqlite")
}

fn default_bucket() -> String {
    "art-archive".into()
}

fn default_version_prefix() -> String {
    "v1".into()
}

fn default_workers() -> usize {
    PipelineConfig::default().workers
}

fn default_queue_capacity() -> usize {
    PipelineConfig::default().queue_capacity
}

fn default_outcome_capacity() -> usize {
    PipelineConfig::default().outcome_capacity
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            artifact_backend: ArtifactBackend::default(),
            bucket: default_bucket(),
            version_prefix: default_version_prefix(),
            s3_endpoint: None,
            s3_region: None,
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            outcome_capacity: default_outcome_capacity(),
            render_enabled: true,
        }
    }
}

impl AppConfig {
    /// Artifact key layout for the configured bucket and prefix.
    pub fn key_layout(&self) -> KeyLayout {
        KeyLayout::new(&self.bucket, &self.version_prefix)
    }

    /// Ingestion pipeline sizing.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            outcome_capacity: self.outcome_capacity,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ARTARCHIVE_`
    /// 2. TOML file from `ARTARCHIVE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ARTARCHIVE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ARTARCHIVE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
