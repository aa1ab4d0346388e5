//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the controller.
use std::sync::Arc;

use crate::tools::{
    CacheListParams, OfflineFetchParams, WorkerEventParams, event_impl, fetch_impl, list_impl, status_impl,
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
use shelter_client::Network;
use shelter_worker::{EventDispatcher, Worker};

/// The main MCP server handler for mcp-offline.
#[derive(Clone)]
pub struct McpOfflineServer {
    worker: Arc<Worker>,
    network: Arc<dyn Network>,
    dispatcher: Arc<EventDispatcher>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl McpOfflineServer {
    /// Create a new server handler around a started controller.
    pub fn new(worker: Arc<Worker>, network: Arc<dyn Network>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { worker, network, dispatcher, tool_router: Self::tool_router() }
    }

    /// Route a request through the offline controller.
    #[tool(
        description = "Fetch a URL or site path through the offline cache controller. Returns status, headers, body and whether it came from the network, the cache, or a synthesized fallback."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.dispatcher, self.network.as_ref(), params.0).await
    }

    /// Report lifecycle state and partition sizes.
    #[tool(description = "Show the controller's lifecycle state, cache version and per-partition entry counts.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// List the keys of one partition.
    #[tool(description = "List cached URLs of a partition (static, images, dynamic, or a full partition name) in insertion order.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker, params.0).await
    }

    /// Deliver a sync, push or notificationclick event.
    #[tool(description = "Deliver a sync, push or notificationclick event to the controller and return its outcome.")]
    async fn worker_event(&self, params: Parameters<WorkerEventParams>) -> Result<CallToolResult, McpError> {
        event_impl(&self.worker, &self.dispatcher, params.0).await
    }
}

impl ServerHandler for McpOfflineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-offline".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::worker_for;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let server = MockServer::start().await;
        let (worker, network) = worker_for(&server).await;
        let handler = McpOfflineServer::new(worker, network, Arc::new(EventDispatcher::new()));

        let names: Vec<String> = handler.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        for expected in ["offline_fetch", "worker_status", "cache_list", "worker_event"] {
            assert!(names.iter().any(|n| n == expected), "{expected} missing");
        }
        assert_eq!(handler.get_info().server_info.name, "mcp-offline");
    }
}
