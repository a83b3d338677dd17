//! cache_validate tool implementation.
//!
//! Reports whether a key's cached pages are complete and readable.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabscan_core::cache::ValidationReport;

use crate::tools::{ToolContext, json_result};

/// Parameters for the cache_validate tool.
///
/// Name the cache either by `cache_key` or by `table` (plus optional
/// environment and database).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheValidateParams {
    /// Cache key as returned by cache_init or table_search.
    #[serde(default)]
    pub cache_key: Option<String>,

    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub database: Option<String>,
}

/// Output from the cache_validate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheValidateOutput {
    #[serde(flatten)]
    pub report: ValidationReport,
}

/// Implementation of the cache_validate tool.
pub async fn validate_impl(ctx: &ToolContext, params: CacheValidateParams) -> Result<CallToolResult, McpError> {
    let key = ctx.resolve_key(
        params.cache_key.as_deref(),
        params.table.as_deref(),
        params.environment.as_deref(),
        params.database.as_deref(),
    )?;

    let report = ctx.scanner.validate(&key).await;
    json_result(&CacheValidateOutput { report })
}
