//! cache_clear tool implementation.
//!
//! Removes one key's artifacts, or the whole cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabscan_core::Error;
use tabscan_core::cache::ClearScope;

use crate::tools::{ToolContext, json_result};

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Cache key to clear.
    #[serde(default)]
    pub cache_key: Option<String>,

    /// Table whose cache to clear, as an alternative to `cache_key`.
    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    /// Clear every key. Cannot be combined with a key or table.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of artifact files removed.
    pub removed: usize,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(ctx: &ToolContext, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let removed = if params.all {
        if params.cache_key.is_some() || params.table.is_some() {
            return Err(Error::InvalidInput("all cannot be combined with cache_key or table".into()).into());
        }
        ctx.scanner.clear(ClearScope::All).await
    } else {
        let key = ctx.resolve_key(
            params.cache_key.as_deref(),
            params.table.as_deref(),
            params.environment.as_deref(),
            params.database.as_deref(),
        )?;
        ctx.scanner.clear(ClearScope::Key(&key)).await
    };

    json_result(&CacheClearOutput { removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, output};
    use tabscan_client::MatchMode;
    use tabscan_core::TableRef;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clear_key() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 25, 10).await;
        let table = TableRef::new("test", "main", "staff");
        ctx.scanner.search(&table, "%", MatchMode::Like).await;

        let params = CacheClearParams { table: Some("staff".into()), ..Default::default() };
        let out: CacheClearOutput = output(&clear_impl(&ctx, params).await.unwrap());
        // metadata plus three pages
        assert_eq!(out.removed, 4);
        assert_eq!(ctx.scanner.stats(&table.cache_key()).await.page_count, 0);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 5, 10).await;
        ctx.scanner
            .initialize_cache(&TableRef::new("test", "main", "staff"))
            .await
            .unwrap();

        let params = CacheClearParams { all: true, ..Default::default() };
        let out: CacheClearOutput = output(&clear_impl(&ctx, params).await.unwrap());
        assert_eq!(out.removed, 1);
    }

    #[tokio::test]
    async fn test_clear_rejects_ambiguous_scope() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 5, 10).await;

        let params = CacheClearParams { all: true, table: Some("staff".into()), ..Default::default() };
        assert!(clear_impl(&ctx, params).await.is_err());
        assert!(clear_impl(&ctx, CacheClearParams::default()).await.is_err());
    }
}
