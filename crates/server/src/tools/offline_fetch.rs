//! offline_fetch tool implementation.
//!
//! Routes one request through the controller's interception hook. Requests
//! the controller passes through are sent to the network unmodified.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_client::{FetchRequest, Method, Network, fetch::resolve};
use shelter_core::Error;
use shelter_worker::{EventDispatcher, EventOutcome, FetchDecision, LifecycleEvent, Response, Worker};

/// Input parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body, sent only when the request is passed through.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// `network`, `cache` or `synthesized`.
    pub source: String,
    /// False when the controller passed the request through.
    pub intercepted: bool,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response headers.
    pub headers: Vec<HeaderEntry>,
    /// Body decoded as UTF-8.
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

pub(crate) async fn fetch_output(
    worker: &Arc<Worker>, dispatcher: &EventDispatcher, network: &dyn Network, params: OfflineFetchParams,
) -> Result<OfflineFetchOutput, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let url = resolve(&worker.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = FetchRequest::new(method, url);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let decision = match dispatcher.dispatch(worker, LifecycleEvent::Fetch(request.clone())).await? {
        EventOutcome::Fetched(decision) => decision,
        other => return Err(Error::InvalidInput(format!("unexpected fetch outcome: {other:?}"))),
    };

    let (intercepted, response) = match decision {
        FetchDecision::Respond(response) => (true, response),
        FetchDecision::Passthrough => {
            tracing::debug!("passthrough {} {}", request.method, request.url);
            (false, Response::from_network(network.fetch(&request).await?))
        }
    };

    Ok(OfflineFetchOutput {
        url: request.url.to_string(),
        status: response.status,
        source: response.source.as_str().to_string(),
        intercepted,
        content_type: response.content_type().map(str::to_string),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| HeaderEntry { name: name.clone(), value: value.clone() })
            .collect(),
        body: response.text(),
    })
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(
    worker: &Arc<Worker>, dispatcher: &EventDispatcher, network: &dyn Network, params: OfflineFetchParams,
) -> Result<CallToolResult, McpError> {
    let output = fetch_output(worker, dispatcher, network, params).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{started_worker_for, worker_for};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(url: &str) -> OfflineFetchParams {
        OfflineFetchParams { url: url.into(), method: default_method(), body: None }
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
    }

    #[tokio::test]
    async fn test_fetch_before_start_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(html("<h1>About</h1>"))
            .mount(&server)
            .await;
        let (worker, network) = worker_for(&server).await;

        let output = fetch_output(&worker, &EventDispatcher::new(), network.as_ref(), params("/about"))
            .await
            .unwrap();
        assert!(!output.intercepted);
        assert_eq!(output.source, "network");
        assert_eq!(output.body, "<h1>About</h1>");
        assert_eq!(worker.storage().entry_count(&worker.config().names.dynamic()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_page_served_from_cache_when_network_is_slow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(html("<h1>About</h1>"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(html("<h1>Later</h1>").set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let (worker, network, dispatcher) = started_worker_for(&server).await;

        let first = fetch_output(&worker, &dispatcher, network.as_ref(), params("/about")).await.unwrap();
        assert!(first.intercepted);
        assert_eq!(first.source, "network");

        let second = fetch_output(&worker, &dispatcher, network.as_ref(), params("/about")).await.unwrap();
        assert_eq!(second.source, "cache");
        assert_eq!(second.body, "<h1>About</h1>");
        assert_eq!(second.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_unreachable_page_gets_offline_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contact"))
            .respond_with(html("<h1>Contact</h1>").set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let (worker, network, dispatcher) = started_worker_for(&server).await;

        let output = fetch_output(&worker, &dispatcher, network.as_ref(), params("/contact")).await.unwrap();
        assert_eq!(output.source, "synthesized");
        assert_eq!(output.status, 200);
        assert!(output.body.contains("You're Offline"));
    }

    #[tokio::test]
    async fn test_post_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/contact"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;
        let (worker, network, dispatcher) = started_worker_for(&server).await;

        let request = OfflineFetchParams {
            url: "/api/contact".into(),
            method: "post".into(),
            body: Some(r#"{"name":"Ada"}"#.into()),
        };
        let output = fetch_output(&worker, &dispatcher, network.as_ref(), request).await.unwrap();
        assert!(!output.intercepted);
        assert_eq!(output.status, 201);
        assert_eq!(output.body, "created");
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_input() {
        let server = MockServer::start().await;
        let (worker, network, dispatcher) = started_worker_for(&server).await;

        let empty = fetch_impl(&worker, &dispatcher, network.as_ref(), params("  ")).await;
        assert!(empty.is_err());

        let bad_method = OfflineFetchParams { url: "/".into(), method: "GE T".into(), body: None };
        let result = fetch_output(&worker, &dispatcher, network.as_ref(), bad_method).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
