//! cache_list tool implementation.
//!
//! Lists the keys of one partition in insertion order.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_core::{Error, PartitionKind};
use shelter_worker::{Worker, WorkerConfig};

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// `static`, `images`, `dynamic`, or a full partition name.
    pub partition: String,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Resolved partition name.
    pub partition: String,
    /// Number of entries.
    pub count: usize,
    /// Entry URLs, oldest first.
    pub urls: Vec<String>,
}

/// Map a partition kind to its current versioned name; anything else is
/// taken as a literal name.
fn partition_name(config: &WorkerConfig, partition: &str) -> Result<String, Error> {
    let partition = partition.trim();
    if partition.is_empty() {
        return Err(Error::InvalidInput("partition cannot be empty".into()));
    }

    Ok(PartitionKind::ALL
        .iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(partition))
        .map(|kind| config.names.partition(*kind))
        .unwrap_or_else(|| partition.to_string()))
}

pub(crate) async fn list_output(worker: &Worker, params: CacheListParams) -> Result<CacheListOutput, Error> {
    let name = partition_name(worker.config(), &params.partition)?;
    if !worker.storage().has_partition(&name).await? {
        return Err(Error::CacheMiss(format!("no partition named {name}")));
    }

    let urls: Vec<String> = worker.storage().keys(&name).await?.into_iter().map(|key| key.url).collect();
    Ok(CacheListOutput { partition: name, count: urls.len(), urls })
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &Worker, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let output = list_output(worker, params).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize keys: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
