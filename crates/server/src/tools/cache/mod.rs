//! Cache-related MCP tools.
//!
//! This module provides tools for priming, auditing, sizing and clearing the
//! page cache.

pub mod clear;
pub mod init;
pub mod stats;
pub mod validate;

pub use clear::{CacheClearParams, clear_impl};
pub use init::{CacheInitParams, init_impl};
pub use stats::{CacheStatsParams, stats_impl};
pub use validate::{CacheValidateParams, validate_impl};
