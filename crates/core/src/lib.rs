//! Core types and shared functionality for tabscan.
//!
//! This crate provides:
//! - File-backed page cache with TTL and completeness audits
//! - The `TableSource` seam and its SQLite implementation
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod source;

pub use cache::{CacheKey, PageStore};
pub use config::AppConfig;
pub use error::Error;
pub use model::{ColumnDescriptor, MatchRecord, Page, Row, TableMetadata, TableRef};
pub use source::{SqliteSource, TableSource};
