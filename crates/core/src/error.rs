//! Unified error types for tabscan.
//!
//! Most of these never reach a caller of the search engine: page-level faults
//! degrade to empty results and a warning. They surface on the metadata path,
//! at startup, and on the MCP tool boundary.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the tabscan engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid tool or caller input (e.g., empty table name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Connection or query failure against the source database.
    #[error("SOURCE_UNAVAILABLE: {0}")]
    SourceUnavailable(String),

    /// A stored artifact could not be read or parsed.
    #[error("CACHE_CORRUPT: {0}")]
    CacheCorrupt(String),

    /// No cache entry exists for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// The search pattern could not be compiled.
    #[error("PATTERN_INVALID: {0}")]
    PatternInvalid(String),

    /// Missing or unparseable settings.
    #[error("CONFIG_INVALID: {0}")]
    ConfigInvalid(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::SourceUnavailable("connection closed".into()),
            _ => Error::SourceUnavailable("connection failed".into()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::SourceUnavailable(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::SourceUnavailable(err.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Error::ConfigInvalid(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::SourceUnavailable(msg) => (-32000, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::CacheCorrupt(msg) => (-32002, msg.clone()),
            Error::PatternInvalid(msg) => (-32003, msg.clone()),
            Error::ConfigInvalid(msg) => (-32004, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
