//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    CacheClearParams, CacheInitParams, CacheStatsParams, CacheValidateParams, TableSearchParams, ToolContext, cache,
    table_search,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for mcp-tabscan.
#[derive(Clone)]
pub struct TableScanServer {
    ctx: ToolContext,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TableScanServer {
    /// Create a new server handler around a configured scanner.
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Search every text column of a table for a pattern. mode=like (default) uses SQL LIKE wildcards % and _ against the whole value, case-insensitive; mode=regex is a case-insensitive regular expression. Pages are cached for later searches."
    )]
    async fn table_search(&self, params: Parameters<TableSearchParams>) -> Result<CallToolResult, McpError> {
        table_search::search_impl(&self.ctx, params.0).await
    }

    #[tool(
        description = "Capture a table's columns, keys and row count into the page cache, or return the cached copy if still fresh. Set refresh=true to drop the table's cache first."
    )]
    async fn cache_init(&self, params: Parameters<CacheInitParams>) -> Result<CallToolResult, McpError> {
        cache::init_impl(&self.ctx, params.0).await
    }

    #[tool(
        description = "Check a table's cache for missing or unreadable pages. Returns is_valid, is_fresh, expected and actual page counts, missing pages and issues."
    )]
    async fn cache_validate(&self, params: Parameters<CacheValidateParams>) -> Result<CallToolResult, McpError> {
        cache::validate_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Report page count, bytes on disk and last modification time of a table's cache.")]
    async fn cache_stats(&self, params: Parameters<CacheStatsParams>) -> Result<CallToolResult, McpError> {
        cache::stats_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Remove a table's cached metadata and pages, or the whole cache with all=true.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.ctx, params.0).await
    }
}

impl ServerHandler for TableScanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-tabscan".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
