//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-tabscan server, plus the
//! target resolution they share.

pub mod cache;
pub mod table_search;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use tabscan_client::TableScanner;
use tabscan_core::{AppConfig, CacheKey, Error, TableRef};

pub use cache::{CacheClearParams, CacheInitParams, CacheStatsParams, CacheValidateParams};
pub use table_search::TableSearchParams;

/// Everything a tool call needs: the scanner and the default target.
#[derive(Clone)]
pub struct ToolContext {
    pub scanner: TableScanner,
    /// Environment used when a call does not name one.
    pub environment: String,
    /// Database used when a call does not name one.
    pub database: String,
}

impl ToolContext {
    pub fn new(config: &AppConfig, scanner: TableScanner) -> Self {
        Self { scanner, environment: config.environment.clone(), database: config.database.clone() }
    }

    /// Build a [`TableRef`], filling in the configured environment and database.
    pub fn resolve_table(
        &self, table: &str, environment: Option<&str>, database: Option<&str>,
    ) -> Result<TableRef, Error> {
        let table = table.trim();
        if table.is_empty() {
            return Err(Error::InvalidInput("table cannot be empty".into()));
        }

        let environment = non_empty(environment).unwrap_or(&self.environment);
        let database = non_empty(database).unwrap_or(&self.database);
        Ok(TableRef::new(environment, database, table))
    }

    /// Resolve a cache key from either an explicit key or a table target.
    pub fn resolve_key(
        &self, cache_key: Option<&str>, table: Option<&str>, environment: Option<&str>, database: Option<&str>,
    ) -> Result<CacheKey, Error> {
        match (non_empty(cache_key), non_empty(table)) {
            (Some(key), None) => Ok(CacheKey::from_raw(key)),
            (None, Some(table)) => Ok(self.resolve_table(table, environment, database)?.cache_key()),
            (Some(_), Some(_)) => Err(Error::InvalidInput("specify either cache_key or table, not both".into())),
            (None, None) => Err(Error::InvalidInput("either cache_key or table must be specified".into())),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Serialize a tool output as pretty JSON text content.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use tabscan_client::{SourceAccessPolicy, TableScanner};
    use tabscan_core::cache::{PageStore, StoreConfig};
    use tabscan_core::{AppConfig, SqliteSource};
    use tempfile::TempDir;

    use super::ToolContext;

    /// Context over an in-memory `staff` table of `rows` rows, cached under `dir`.
    pub(crate) async fn context(dir: &TempDir, rows: u32, page_size: u64) -> ToolContext {
        let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE staff (id INTEGER PRIMARY KEY, login TEXT NOT NULL, team TEXT);
                 WITH RECURSIVE seq(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM seq WHERE i < {rows})
                 INSERT INTO staff (id, login, team)
                 SELECT i, 'user_' || i, CASE WHEN i % 2 = 0 THEN 'AD_Managers' ELSE NULL END FROM seq;"
            ))
        })
        .await
        .unwrap();

        let config = AppConfig {
            environment: "test".into(),
            database: "main".into(),
            cache_dir: dir.path().to_path_buf(),
            page_size,
            pacing_ms: 0,
            ..AppConfig::default()
        };
        let store = PageStore::open(StoreConfig::from(&config)).await.unwrap();
        let policy = Arc::new(SourceAccessPolicy::from_config(&config));
        let scanner = TableScanner::new(&config, store, Arc::new(SqliteSource::from_connection(conn)), policy);
        ToolContext::new(&config, scanner)
    }

    /// Parse the JSON text content of a tool result.
    pub(crate) fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_resolve_table_defaults() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir, 1, 10).await;

        let table = ctx.resolve_table("staff", None, Some(" ")).unwrap();
        assert_eq!(table, TableRef::new("test", "main", "staff"));

        let table = ctx.resolve_table("staff", Some("prod"), Some("aux")).unwrap();
        assert_eq!(table.cache_key().as_str(), "prod_aux_staff");

        assert!(matches!(ctx.resolve_table("  ", None, None), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_resolve_key() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir, 1, 10).await;

        assert_eq!(ctx.resolve_key(Some("dev_main_users"), None, None, None).unwrap().as_str(), "dev_main_users");
        assert_eq!(ctx.resolve_key(None, Some("staff"), None, None).unwrap().as_str(), "test_main_staff");
        assert!(ctx.resolve_key(None, None, None, None).is_err());
        assert!(ctx.resolve_key(Some("k"), Some("staff"), None, None).is_err());
    }
}
