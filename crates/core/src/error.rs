//! Unified error types for artarchive.
//!
//! Each variant renders with a stable code prefix so callers (the MCP server,
//! the CLI) can classify failures without matching on message text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::rusqlite::ErrorCode as SqliteCode;

/// Unified error type for the archive core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A candidate is missing a required field. Not retried.
    #[error("INVALID_CANDIDATE: {0}")]
    InvalidCandidate(String),

    /// A stored or supplied document could not be decoded.
    #[error("MALFORMED_DOCUMENT: {0}")]
    MalformedDocument(String),

    /// The metadata store could not be reached. Retryable.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// The artifact store could not be reached. Retryable, and never
    /// evidence that an artifact is absent.
    #[error("ARTIFACT_STORE_UNAVAILABLE: {0}")]
    ArtifactStoreUnavailable(String),

    /// No slide exists for the given GUID hash.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Caller error such as an empty identity key.
    #[error("CONSTRAINT_VIOLATION: {0}")]
    ConstraintViolation(String),

    /// Invalid request parameters (e.g., an unparseable cursor).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The renderer failed to produce an artifact.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// The ingestion pipeline has shut down.
    #[error("PIPELINE_CLOSED")]
    PipelineClosed,
}

impl Error {
    /// Whether the caller may retry the operation after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::ArtifactStoreUnavailable(_))
    }

    /// Stable code prefix used in messages and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidCandidate(_) => "INVALID_CANDIDATE",
            Error::MalformedDocument(_) => "MALFORMED_DOCUMENT",
            Error::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Error::ArtifactStoreUnavailable(_) => "ARTIFACT_STORE_UNAVAILABLE",
            Error::NotFound(_) => "NOT_FOUND",
            Error::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Database(_) | Error::MigrationFailed(_) => "STORE_ERROR",
            Error::RenderFailed(_) => "RENDER_FAILED",
            Error::PipelineClosed => "PIPELINE_CLOSED",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::StoreUnavailable("connection closed".into()),
            tokio_rusqlite::Error::Close(_) => Error::StoreUnavailable("connection close failed".into()),
            _ => Error::StoreUnavailable("connection closed".into()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e.into(),
            tokio_rusqlite::Error::ConnectionClosed => Error::StoreUnavailable("connection closed".into()),
            other => Error::Database(other),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(SqliteCode::DatabaseBusy | SqliteCode::DatabaseLocked | SqliteCode::CannotOpen) => {
                Error::StoreUnavailable(err.to_string())
            }
            _ => Error::Database(tokio_rusqlite::Error::Error(err)),
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        let code = match &err {
            Error::InvalidCandidate(_)
            | Error::InvalidInput(_)
            | Error::ConstraintViolation(_)
            | Error::MalformedDocument(_) => -32602,
            Error::NotFound(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::StoreUnavailable(_) | Error::ArtifactStoreUnavailable(_) | Error::PipelineClosed => -32003,
            Error::RenderFailed(_) => -32004,
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
