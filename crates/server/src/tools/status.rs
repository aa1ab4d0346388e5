//! worker_status tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use shelter_core::Error;
use shelter_worker::Worker;

/// Implementation of the worker_status tool.
pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let status = worker.status().await?;
    let json = serde_json::to_string_pretty(&status)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
