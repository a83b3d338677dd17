//! File-backed cache of table metadata and row pages.
//!
//! This module provides a durable, key-addressed store for paginated table
//! data. It supports:
//!
//! - Deterministic artifact naming per table (`<key>_page_000001.json.gz`)
//! - Optional gzip compression of artifacts
//! - TTL-based metadata expiry
//! - Completeness audits (missing pages, unreadable boundaries)

pub mod codec;
pub mod key;
pub mod store;
pub mod validate;

pub use crate::Error;

pub use key::CacheKey;
pub use store::{CacheStats, ClearScope, MetadataLookup, PageStore, StoreAudit, StoreConfig};
pub use validate::{CacheValidator, ValidationReport};
