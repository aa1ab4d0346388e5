//! mcp-offline server entry point.
//!
//! This is the main binary that boots the offline controller and serves it
//! over the MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shelter_client::{FetchClient, FetchConfig, Network};
use shelter_core::{AppConfig, CacheStorage};
use shelter_worker::{EventDispatcher, Worker, WorkerConfig};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        version = %config.version,
        db_path = %config.db_path.display(),
        "Starting mcp-offline server on stdio transport"
    );

    let storage = CacheStorage::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        ..Default::default()
    })?);
    let worker = Arc::new(Worker::new(WorkerConfig::from_app(&config)?, storage, Arc::clone(&network)));

    let dispatcher = Arc::new(EventDispatcher::new());
    let (install, activate) = dispatcher.start(&worker).await?;
    tracing::info!(
        installed = install.succeeded(),
        deleted = activate.deleted.len(),
        "controller activated"
    );

    let handler = handler::McpOfflineServer::new(Arc::clone(&worker), network, dispatcher);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.shutdown().await;

    Ok(())
}
