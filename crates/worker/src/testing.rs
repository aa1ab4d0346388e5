//! Scripted network and worker builders for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use shelter_client::{FetchRequest, FetchResponse, Network};
use shelter_core::{CacheStorage, Error};
use url::Url;

use crate::config::WorkerConfig;
use crate::worker::Worker;

pub(crate) const ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
enum Script {
    Respond { status: u16, body: String, content_type: String },
    Fail,
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, Script>,
    delays: HashMap<String, Duration>,
    calls: HashMap<String, usize>,
}

/// Network double keyed by request path. Unscripted paths answer 200
/// with `network:{path}`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedNetwork {
    state: Arc<Mutex<State>>,
    cancelled: Arc<AtomicUsize>,
}

/// Counts a request as cancelled if it is dropped before finishing.
struct CancelGuard {
    cancelled: Arc<AtomicUsize>,
    done: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.done {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &str, content_type: &str) {
        let script = Script::Respond { status, body: body.to_string(), content_type: content_type.to_string() };
        self.state.lock().unwrap().scripts.insert(path.to_string(), script);
    }

    pub(crate) fn fail(&self, path: &str) {
        self.state.lock().unwrap().scripts.insert(path.to_string(), Script::Fail);
    }

    /// Hold the response for `path` back by `delay`.
    pub(crate) fn delay(&self, path: &str, delay: Duration) {
        self.state.lock().unwrap().delays.insert(path.to_string(), delay);
    }

    pub(crate) fn calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub(crate) fn calls_for(&self, path: &str) -> usize {
        self.state.lock().unwrap().calls.get(path).copied().unwrap_or(0)
    }

    /// Requests dropped before they completed.
    pub(crate) fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let path = request.url.path().to_string();
        let (script, delay) = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(path.clone()).or_default() += 1;
            (state.scripts.get(&path).cloned(), state.delays.get(&path).copied())
        };

        let mut guard = CancelGuard { cancelled: Arc::clone(&self.cancelled), done: false };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        guard.done = true;

        let (status, body, content_type) = match script {
            Some(Script::Fail) => return Err(Error::Network(format!("connection refused: {}", request.url))),
            Some(Script::Respond { status, body, content_type }) => (status, body, content_type),
            None => (200, format!("network:{path}"), "text/plain".to_string()),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(&content_type).unwrap());

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            content_type: Some(content_type),
            bytes: Bytes::from(body),
            headers,
            fetch_ms: 0,
        })
    }
}

/// GET request for `path` on the test origin.
pub(crate) fn get(path: &str) -> FetchRequest {
    FetchRequest::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
}

pub(crate) async fn worker_with(network: ScriptedNetwork) -> Worker {
    worker_with_config(network, |c| c).await
}

pub(crate) async fn worker_with_config(
    network: ScriptedNetwork, configure: impl FnOnce(WorkerConfig) -> WorkerConfig,
) -> Worker {
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let config = configure(WorkerConfig::for_origin(Url::parse(ORIGIN).unwrap()));
    Worker::new(config, storage, Arc::new(network))
}
