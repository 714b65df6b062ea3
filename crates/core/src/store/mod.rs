//! SQLite-backed metadata store for slides.
//!
//! This module provides the single-table document store with async access
//! via tokio-rusqlite. It supports:
//!
//! - One encoded document per slide, keyed by GUID hash
//! - Automatic schema migrations
//! - WAL mode for concurrent access from pipeline workers
//! - Cursor-paged listing in write order and SQL-side site aggregation

pub mod connection;
pub mod migrations;
pub mod sites;
pub mod slides;

pub use connection::SlideDb;
pub use slides::{Cursor, SlidePage, SlidePages};
