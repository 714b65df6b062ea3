//! Core types and shared functionality for artarchive.
//!
//! This crate provides:
//! - The slide model, its document codec and identity hashing
//! - The SQLite slide store
//! - Artifact storage and the render hash ledger
//! - The bounded ingestion pipeline
//! - Unified error types
//! - Configuration structures

pub mod archive;
pub mod artifact;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod render;
pub mod slide;
pub mod store;

pub use archive::{Archive, RenderOutcome};
pub use artifact::{ArtifactKey, ArtifactStore, Artifacts, KeyLayout, MemoryArtifactStore};
pub use config::{AppConfig, ArtifactBackend, ConfigError};
pub use error::Error;
pub use ledger::CacheStatus;
pub use pipeline::{FanOut, IngestRouter, IngestStatus, Outcome, Pipeline, PipelineConfig, Producer};
pub use render::{Rendered, SlideRenderer, TemplateRenderer};
pub use slide::{Candidate, RenderKind, Site, Slide};
pub use store::{Cursor, SlideDb, SlidePage};
