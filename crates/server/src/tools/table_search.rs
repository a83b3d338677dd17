//! table_search tool implementation.
//!
//! Scans every textual column of a table for a LIKE or regex pattern, filling
//! the page cache as it goes.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabscan_client::MatchMode;
use tabscan_core::{Error, MatchRecord};

use super::{ToolContext, json_result};

/// Input parameters for table_search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableSearchParams {
    /// Table to search (required).
    pub table: String,

    /// Pattern to look for. LIKE patterns use `%` and `_` and must match the whole value.
    pub pattern: String,

    /// Pattern syntax: like (default) or regex.
    #[serde(default)]
    pub mode: MatchMode,

    /// Environment label; defaults to the server's configured environment.
    #[serde(default)]
    pub environment: Option<String>,

    /// Database (SQLite schema name); defaults to the server's configured database.
    #[serde(default)]
    pub database: Option<String>,

    /// Return at most this many matches. All pages are scanned regardless.
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Output structure for table_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSearchOutput {
    /// Cache key of the searched table.
    pub cache_key: String,
    /// Matching column values with their row keys.
    pub matches: Vec<MatchRecord>,
    /// Matches found before `max_results` was applied.
    pub total_matches: usize,
    /// Whether `matches` was cut by `max_results`.
    pub truncated: bool,
    pub elapsed_ms: u64,
    pub pages_processed: u64,
    pub total_pages: u64,
    /// Pages the source could not deliver; non-zero means the result is partial.
    pub degraded_pages: u64,
}

/// Implementation of the table_search tool.
pub async fn search_impl(ctx: &ToolContext, params: TableSearchParams) -> Result<CallToolResult, McpError> {
    if params.pattern.is_empty() {
        return Err(Error::InvalidInput("pattern cannot be empty".into()).into());
    }
    if params.max_results == Some(0) {
        return Err(Error::InvalidInput("max_results must be at least 1".into()).into());
    }

    let table = ctx.resolve_table(&params.table, params.environment.as_deref(), params.database.as_deref())?;
    let outcome = ctx.scanner.search(&table, &params.pattern, params.mode).await;

    let total_matches = outcome.matches.len();
    let mut matches = outcome.matches;
    let truncated = params.max_results.is_some_and(|max| total_matches > max);
    if let Some(max) = params.max_results {
        matches.truncate(max);
    }

    let output = TableSearchOutput {
        cache_key: table.cache_key().to_string(),
        matches,
        total_matches,
        truncated,
        elapsed_ms: outcome.elapsed_ms,
        pages_processed: outcome.pages_processed,
        total_pages: outcome.total_pages,
        degraded_pages: outcome.degraded_pages,
    };

    json_result(&output)
}
