//! Client code for artarchive.
//!
//! This crate provides the networked artifact store backends shared by the
//! server and CLI.

pub mod s3;

pub use s3::{S3ArtifactStore, S3Options};
