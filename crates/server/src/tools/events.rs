//! worker_event tool implementation.
//!
//! Delivers the auxiliary lifecycle events. Install and activate run once
//! at startup and are not accepted here.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_core::Error;
use shelter_worker::{EventDispatcher, EventOutcome, LifecycleEvent, Worker};

/// Parameters for the worker_event tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerEventParams {
    /// `sync`, `push` or `notificationclick`.
    pub event: String,

    /// Sync tag (required for `sync`).
    #[serde(default)]
    pub tag: Option<String>,

    /// Push payload text.
    #[serde(default)]
    pub data: Option<String>,

    /// Notification action that was clicked.
    #[serde(default)]
    pub action: Option<String>,
}

/// Output from the worker_event tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerEventOutput {
    /// The event that was delivered.
    pub event: String,
    /// Handler outcome.
    pub outcome: serde_json::Value,
}

fn to_event(params: WorkerEventParams) -> Result<LifecycleEvent, Error> {
    match params.event.trim().to_ascii_lowercase().as_str() {
        "sync" => {
            let tag = params
                .tag
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| Error::InvalidInput("sync requires a tag".into()))?;
            Ok(LifecycleEvent::Sync { tag })
        }
        "push" => Ok(LifecycleEvent::Push { data: params.data }),
        "notificationclick" => Ok(LifecycleEvent::NotificationClick { action: params.action }),
        other => Err(Error::InvalidInput(format!("unsupported event: {other}"))),
    }
}

pub(crate) async fn event_output(
    worker: &Arc<Worker>, dispatcher: &EventDispatcher, params: WorkerEventParams,
) -> Result<WorkerEventOutput, Error> {
    let event = params.event.trim().to_ascii_lowercase();
    let outcome = dispatcher.dispatch(worker, to_event(params)?).await?;

    let value = match outcome {
        EventOutcome::Synced(report) => serde_json::to_value(report),
        EventOutcome::Notify(notification) => serde_json::to_value(notification),
        EventOutcome::Clicked(report) => serde_json::to_value(report),
        other => return Err(Error::InvalidInput(format!("unexpected outcome for {event}: {other:?}"))),
    }
    .map_err(|e| Error::InvalidInput(format!("Failed to serialize outcome: {e}")))?;

    Ok(WorkerEventOutput { event, outcome: value })
}

/// Implementation of the worker_event tool.
pub async fn event_impl(
    worker: &Arc<Worker>, dispatcher: &EventDispatcher, params: WorkerEventParams,
) -> Result<CallToolResult, McpError> {
    let output = event_output(worker, dispatcher, params).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize outcome: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
