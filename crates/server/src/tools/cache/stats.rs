//! cache_stats tool implementation.
//!
//! Reports how many pages a key has stored and how much disk they use.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{ToolContext, json_result};

/// Parameters for the cache_stats tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsParams {
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

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub cache_key: String,
    pub page_count: u64,
    /// Bytes on disk across the key's metadata and pages.
    pub byte_size: u64,
    /// RFC 3339 time of the newest artifact, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(ctx: &ToolContext, params: CacheStatsParams) -> Result<CallToolResult, McpError> {
    let key = ctx.resolve_key(
        params.cache_key.as_deref(),
        params.table.as_deref(),
        params.environment.as_deref(),
        params.database.as_deref(),
    )?;

    let stats = ctx.scanner.stats(&key).await;
    let output = CacheStatsOutput {
        cache_key: key.to_string(),
        page_count: stats.page_count,
        byte_size: stats.byte_size,
        last_modified: stats.last_modified.map(|t| t.to_rfc3339()),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, output};
    use tabscan_client::MatchMode;
    use tabscan_core::TableRef;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stats_counts_pages() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 25, 10).await;
        ctx.scanner
            .search(&TableRef::new("test", "main", "staff"), "user_%", MatchMode::Like)
            .await;

        let params = CacheStatsParams { table: Some("staff".into()), ..Default::default() };
        let out: CacheStatsOutput = output(&stats_impl(&ctx, params).await.unwrap());
        assert_eq!(out.cache_key, "test_main_staff");
        assert_eq!(out.page_count, 3);
        assert!(out.byte_size > 0);
        assert!(out.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_stats_empty_key() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 5, 10).await;

        let params = CacheStatsParams { cache_key: Some("nobody_main_here".into()), ..Default::default() };
        let out: CacheStatsOutput = output(&stats_impl(&ctx, params).await.unwrap());
        assert_eq!(out.page_count, 0);
        assert_eq!(out.byte_size, 0);
        assert!(out.last_modified.is_none());
    }
}
