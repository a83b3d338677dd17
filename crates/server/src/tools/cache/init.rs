//! cache_init tool implementation.
//!
//! Captures a table's metadata (or returns the fresh cached copy) so later
//! searches know how many pages to walk.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabscan_core::TableMetadata;

use crate::tools::{ToolContext, json_result};

/// Parameters for the cache_init tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheInitParams {
    /// Table to initialize (required).
    pub table: String,

    /// Environment label; defaults to the server's configured environment.
    #[serde(default)]
    pub environment: Option<String>,

    /// Database (SQLite schema name); defaults to the server's configured database.
    #[serde(default)]
    pub database: Option<String>,

    /// Drop everything cached for the table and recapture it.
    #[serde(default)]
    pub refresh: bool,
}

/// Output from the cache_init tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInitOutput {
    pub cache_key: String,
    pub total_rows: u64,
    pub page_size: u64,
    pub expected_pages: u64,
    /// Column names in declaration order.
    pub columns: Vec<String>,
    /// Columns a search scans.
    pub searchable_columns: Vec<String>,
    pub key_columns: Vec<String>,
    /// Ordering used for page windows.
    pub order_by: Vec<String>,
    /// RFC 3339 capture time.
    pub captured_at: String,
    /// Whether a full search has stored every page.
    pub is_complete: bool,
}

impl From<&TableMetadata> for CacheInitOutput {
    fn from(meta: &TableMetadata) -> Self {
        Self {
            cache_key: meta.cache_key().to_string(),
            total_rows: meta.total_rows,
            page_size: meta.page_size,
            expected_pages: meta.expected_pages(),
            columns: meta.column_names(),
            searchable_columns: meta.searchable_columns(),
            key_columns: meta.key_columns.clone(),
            order_by: meta.order_by.clone(),
            captured_at: meta.captured_at.to_rfc3339(),
            is_complete: meta.is_complete,
        }
    }
}

/// Implementation of the cache_init tool.
pub async fn init_impl(ctx: &ToolContext, params: CacheInitParams) -> Result<CallToolResult, McpError> {
    let table = ctx.resolve_table(&params.table, params.environment.as_deref(), params.database.as_deref())?;

    let meta = if params.refresh {
        ctx.scanner.refresh_cache(&table).await?
    } else {
        ctx.scanner.initialize_cache(&table).await?
    };

    json_result(&CacheInitOutput::from(&meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, output};
    use tempfile::TempDir;

    fn params(table: &str) -> CacheInitParams {
        CacheInitParams { table: table.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_init_captures_metadata() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 25, 10).await;

        let out: CacheInitOutput = output(&init_impl(&ctx, params("staff")).await.unwrap());
        assert_eq!(out.cache_key, "test_main_staff");
        assert_eq!(out.total_rows, 25);
        assert_eq!(out.expected_pages, 3);
        assert_eq!(out.columns, ["id", "login", "team"]);
        assert_eq!(out.searchable_columns, ["login", "team"]);
        assert_eq!(out.key_columns, ["id"]);
        assert_eq!(out.order_by, ["id"]);
        assert!(!out.is_complete);
    }

    #[tokio::test]
    async fn test_init_reuses_fresh_metadata() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 5, 10).await;

        let first: CacheInitOutput = output(&init_impl(&ctx, params("staff")).await.unwrap());
        let second: CacheInitOutput = output(&init_impl(&ctx, params("staff")).await.unwrap());
        assert_eq!(first.captured_at, second.captured_at);

        let mut p = params("staff");
        p.refresh = true;
        let refreshed: CacheInitOutput = output(&init_impl(&ctx, p).await.unwrap());
        assert_eq!(refreshed.total_rows, 5);
    }

    #[tokio::test]
    async fn test_init_unknown_table() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 5, 10).await;

        assert!(init_impl(&ctx, params("missing")).await.is_err());
        assert!(init_impl(&ctx, params("")).await.is_err());
    }
}
