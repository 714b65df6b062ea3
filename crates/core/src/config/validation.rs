//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, ArtifactBackend};
use thiserror::Error;

/// Upper bound on ingestion workers; they share one SQLite writer.
const MAX_WORKERS: usize = 64;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `workers` is 0 or exceeds 64
    /// - `queue_capacity` or `outcome_capacity` is 0
    /// - `version_prefix` is empty or contains `/`
    /// - `bucket` is empty or contains `/`
    ///
    /// Returns `ConfigError::Missing` if the S3 backend is selected without a
    /// bucket.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(invalid("workers", "must be greater than 0"));
        }
        if self.workers > MAX_WORKERS {
            return Err(invalid("workers", "must not exceed 64"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be greater than 0"));
        }
        if self.outcome_capacity == 0 {
            return Err(invalid("outcome_capacity", "must be greater than 0"));
        }

        if self.version_prefix.is_empty() || self.version_prefix.contains('/') {
            return Err(invalid("version_prefix", "must be a non-empty key segment without '/'"));
        }

        if self.bucket.is_empty() {
            if self.artifact_backend == ArtifactBackend::S3 {
                return Err(ConfigError::Missing {
                    field: "bucket".into(),
                    hint: "Set ARTARCHIVE_BUCKET environment variable".into(),
                });
            }
            return Err(invalid("bucket", "must not be empty"));
        }
        if self.bucket.contains('/') {
            return Err(invalid("bucket", "must not contain '/'"));
        }

        if self.s3_endpoint.is_some() && self.artifact_backend != ArtifactBackend::S3 {
            tracing::warn!(
                backend = %self.artifact_backend,
                "s3_endpoint is set but the artifact backend is not s3; ignoring"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_workers_zero() {
        let config = AppConfig { workers: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "workers"));
    }

    #[test]
    fn test_validate_workers_exceeds_limit() {
        let config = AppConfig { workers: 65, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "workers"));
    }

    #[test]
    fn test_validate_zero_capacities() {
        let queue = AppConfig { queue_capacity: 0, ..Default::default() };
        assert!(matches!(queue.validate(), Err(ConfigError::Invalid { field, .. }) if field == "queue_capacity"));

        let outcome = AppConfig { outcome_capacity: 0, ..Default::default() };
        assert!(matches!(outcome.validate(), Err(ConfigError::Invalid { field, .. }) if field == "outcome_capacity"));
    }

    #[test]
    fn test_validate_version_prefix() {
        let empty = AppConfig { version_prefix: String::new(), ..Default::default() };
        assert!(matches!(empty.validate(), Err(ConfigError::Invalid { field, .. }) if field == "version_prefix"));

        let nested = AppConfig { version_prefix: "v1/x".into(), ..Default::default() };
        assert!(matches!(nested.validate(), Err(ConfigError::Invalid { field, .. }) if field == "version_prefix"));
    }

    #[test]
    fn test_validate_s3_requires_bucket() {
        let config = AppConfig { artifact_backend: ArtifactBackend::S3, bucket: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "bucket"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { workers: 64, queue_capacity: 1, outcome_capacity: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
