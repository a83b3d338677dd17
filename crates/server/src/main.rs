//! mcp-tabscan server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tabscan_client::{SourceAccessPolicy, TableScanner};
use tabscan_core::cache::{PageStore, StoreConfig};
use tabscan_core::{AppConfig, SqliteSource};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        source = %config.source_path.display(),
        cache_dir = %config.cache_dir.display(),
        page_size = config.page_size,
        "Starting mcp-tabscan server on stdio transport"
    );

    let store = PageStore::open(StoreConfig::from(&config)).await?;
    let source = SqliteSource::open(&config.source_path, config.command_timeout()).await?;
    let policy = Arc::new(SourceAccessPolicy::from_config(&config));
    let scanner = TableScanner::new(&config, store, Arc::new(source), policy);

    let handler = handler::TableScanServer::new(tools::ToolContext::new(&config, scanner));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
