//! The cache router: interception, dispatch to a strategy, top-level fallback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Method;
use serde::Serialize;
use shelter_client::{FetchRequest, FetchResponse, Network, fetch::resolve, fetch::same_origin};
use shelter_core::{CacheStorage, CachedResponse, Error, RequestKey};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::classify::{RequestClass, classify};
use crate::config::WorkerConfig;
use crate::fallback;
use crate::lifecycle::WorkerState;
use crate::response::{FetchDecision, Response};

/// One controller instance.
///
/// Holds the storage and network handles, the lifecycle state and the
/// background revalidation tasks it has spawned.
pub struct Worker {
    pub(crate) config: WorkerConfig,
    pub(crate) storage: CacheStorage,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) state: watch::Sender<WorkerState>,
    pub(crate) controlling: AtomicBool,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

/// Entry count of one current partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatus {
    pub name: String,
    pub entries: u64,
    pub limit: Option<usize>,
}

/// Snapshot of the controller for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub version: String,
    pub controlling: bool,
    pub partitions: Vec<PartitionStatus>,
}

impl Worker {
    pub fn new(config: WorkerConfig, storage: CacheStorage, network: Arc<dyn Network>) -> Self {
        let (state, _) = watch::channel(WorkerState::Installing);
        Self {
            config,
            storage,
            network,
            state,
            controlling: AtomicBool::new(false),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Whether this instance has claimed its clients.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    /// Resolve a site path against the configured origin into a cache key.
    pub fn key_for(&self, path: &str) -> Result<RequestKey, Error> {
        let url = resolve(&self.config.origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(RequestKey::get(url.as_str()))
    }

    /// Route one intercepted request.
    ///
    /// Non-GET and cross-origin requests are passed through. Every other
    /// request gets a response: routing errors end in the offline fallback.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> FetchDecision {
        if request.method != Method::GET || !same_origin(&self.config.origin, &request.url) {
            tracing::debug!("passthrough {} {}", request.method, request.url);
            return FetchDecision::Passthrough;
        }

        // Keys are stored without fragments, as install resolves them.
        let mut request = request.clone();
        request.url.set_fragment(None);
        let request = &request;

        let class = classify(request.url.path());
        let result = match class {
            RequestClass::Static => self.serve_static(request).await,
            RequestClass::Image => self.serve_image(request).await,
            RequestClass::Html => self.serve_page(request).await,
            RequestClass::Other => self.serve_dynamic(request).await,
        };

        match result {
            Ok(response) => FetchDecision::Respond(response),
            Err(e) => {
                tracing::warn!(url = %request.url, ?class, error = %e, "routing failed, serving offline fallback");
                FetchDecision::Respond(self.offline_fallback(request.url.path()).await)
            }
        }
    }

    /// Best-effort response for a request whose routing failed, chosen by
    /// re-classifying the path.
    pub async fn offline_fallback(&self, path: &str) -> Response {
        match classify(path) {
            RequestClass::Image => self.placeholder().await,
            RequestClass::Html => fallback::offline_page(),
            RequestClass::Static | RequestClass::Other => fallback::service_unavailable(),
        }
    }

    /// The cached placeholder image if any current partition has one,
    /// otherwise a synthesized SVG.
    pub(crate) async fn placeholder(&self) -> Response {
        let cached = match self.key_for(&self.config.placeholder_path) {
            Ok(key) => self.storage.match_any(&self.config.names.current(), &key).await,
            Err(e) => Err(e),
        };

        match cached {
            Ok(Some(response)) => Response::from_cache(response),
            Ok(None) => fallback::placeholder_image(),
            Err(e) => {
                tracing::debug!(error = %e, "placeholder lookup failed");
                fallback::placeholder_image()
            }
        }
    }

    /// Network attempt raced against the configured timeout. The losing
    /// request future is dropped, which aborts it.
    pub(crate) async fn fetch_with_timeout(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let timeout = self.config.network_timeout;
        match tokio::time::timeout(timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
        }
    }

    /// Store a copy of an ok network response, then apply the partition
    /// bound if it has one. Write failures are logged; the caller still
    /// serves the network response.
    pub(crate) async fn store(&self, partition: &str, key: &RequestKey, response: &FetchResponse, limit: Option<usize>) {
        if let Err(e) = self.storage.put(partition, key, &CachedResponse::from(response)).await {
            tracing::warn!(partition, url = %key.url, error = %e, "cache write failed");
            return;
        }

        if let Some(limit) = limit {
            self.enforce_limit(partition, limit).await;
        }
    }

    /// FIFO eviction down to `limit` entries.
    pub(crate) async fn enforce_limit(&self, partition: &str, limit: usize) {
        match self.storage.trim_partition(partition, limit).await {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(partition, evicted, limit, "evicted oldest entries"),
            Err(e) => tracing::warn!(partition, error = %e, "eviction failed"),
        }
    }

    /// Refresh a static entry in the background. The caller is not delayed
    /// and failures are discarded.
    pub(crate) fn spawn_revalidation(&self, partition: String, request: FetchRequest) {
        let network = Arc::clone(&self.network);
        let storage = self.storage.clone();
        let shutdown = self.shutdown.clone();

        self.tasks.spawn(async move {
            let refresh = async {
                let response = network.fetch(&request).await?;
                if response.ok() {
                    let key = RequestKey::get(request.url.as_str());
                    storage.put(&partition, &key, &CachedResponse::from(&response)).await?;
                    Ok::<bool, Error>(true)
                } else {
                    Ok(false)
                }
            };

            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::debug!(url = %request.url, "revalidation cancelled");
                }
                result = refresh => match result {
                    Ok(true) => tracing::debug!(url = %request.url, "revalidated"),
                    Ok(false) => tracing::debug!(url = %request.url, "revalidation returned non-ok status"),
                    Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
                },
            }
        });
    }

    /// Wait until every background revalidation spawned so far has finished.
    pub async fn wait_for_revalidations(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Number of background revalidations still running.
    pub fn pending_revalidations(&self) -> usize {
        self.tasks.len()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Tear this instance down: cancel background work and mark it redundant.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        self.controlling.store(false, Ordering::SeqCst);
        self.set_state(WorkerState::Redundant);
    }

    /// Current state and partition sizes.
    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        let names = &self.config.names;
        let bounded = [
            (names.static_assets(), None),
            (names.dynamic(), Some(self.config.dynamic_cache_limit)),
            (names.images(), Some(self.config.image_cache_limit)),
        ];

        let mut partitions = Vec::with_capacity(bounded.len());
        for (name, limit) in bounded {
            let entries = self.storage.entry_count(&name).await?;
            partitions.push(PartitionStatus { name, entries, limit });
        }

        Ok(WorkerStatus {
            state: self.state(),
            version: names.version().to_string(),
            controlling: self.is_controlling(),
            partitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseSource;
    use crate::testing::{ScriptedNetwork, get, worker_with};

    #[tokio::test]
    async fn test_non_get_is_passthrough() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;

        let request = FetchRequest::new(Method::POST, url::Url::parse("http://localhost:8080/api/contact").unwrap());
        assert_eq!(worker.handle_fetch(&request).await, FetchDecision::Passthrough);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cross_origin_is_passthrough() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;

        let request = FetchRequest::get(url::Url::parse("https://fonts.example.com/inter.woff2").unwrap());
        assert_eq!(worker.handle_fetch(&request).await, FetchDecision::Passthrough);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_by_class() {
        let worker = worker_with(ScriptedNetwork::new()).await;

        let image = worker.offline_fallback("/images/profile.jpg").await;
        assert_eq!(image.content_type(), Some("image/svg+xml"));

        let page = worker.offline_fallback("/about").await;
        assert!(page.text().contains("You're Offline"));

        let other = worker.offline_fallback("/resume.pdf").await;
        assert_eq!(other.status, 503);
        assert_eq!(other.text(), "Service Unavailable");

        let script = worker.offline_fallback("/js/main.js").await;
        assert_eq!(script.status, 503);
    }

    #[tokio::test]
    async fn test_static_network_failure_uses_top_level_fallback() {
        let network = ScriptedNetwork::new();
        network.fail("/js/main.js");
        let worker = worker_with(network.clone()).await;

        let response = worker.handle_fetch(&get("/js/main.js")).await.into_response().unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "Service Unavailable");
        assert_eq!(response.source, ResponseSource::Synthesized);
    }

    async fn seed_corrupt(worker: &Worker, partition: &str, path: &str) {
        let key = worker.key_for(path).unwrap();
        let stored = CachedResponse::new(200, vec![("content-type".into(), "text/plain".into())], b"ok".to_vec());
        worker.storage.put(partition, &key, &stored).await.unwrap();
        assert!(worker.storage.corrupt_entry(partition, &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_read_failure_uses_top_level_fallback() {
        let network = ScriptedNetwork::new();
        network.fail("/about");
        network.fail("/data/projects.json");
        let worker = worker_with(network.clone()).await;
        let names = worker.config.names.clone();

        seed_corrupt(&worker, &names.images(), "/images/a.png").await;
        seed_corrupt(&worker, &names.static_assets(), "/css/styles.css").await;
        seed_corrupt(&worker, &names.dynamic(), "/about").await;
        seed_corrupt(&worker, &names.dynamic(), "/data/projects.json").await;

        let image = worker.handle_fetch(&get("/images/a.png")).await.into_response().unwrap();
        assert_eq!(image.status, 200);
        assert_eq!(image.content_type(), Some("image/svg+xml"));
        assert_eq!(image.source, ResponseSource::Synthesized);
        assert_eq!(network.calls_for("/images/a.png"), 0);

        let script = worker.handle_fetch(&get("/css/styles.css")).await.into_response().unwrap();
        assert_eq!(script.status, 503);
        assert_eq!(script.text(), "Service Unavailable");

        let page = worker.handle_fetch(&get("/about")).await.into_response().unwrap();
        assert_eq!(page.status, 200);
        assert!(page.text().contains("You're Offline"));

        let other = worker.handle_fetch(&get("/data/projects.json")).await.into_response().unwrap();
        assert_eq!(other.status, 503);
        assert_eq!(other.text(), "Service Unavailable");
    }

    #[tokio::test]
    async fn test_fragment_does_not_change_cache_key() {
        let network = ScriptedNetwork::new();
        network.respond("/css/styles.css", 200, "body{}", "text/css");
        let worker = worker_with(network.clone()).await;
        worker.handle_fetch(&get("/css/styles.css")).await;

        let response = worker.handle_fetch(&get("/css/styles.css#theme")).await.into_response().unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.text(), "body{}");
    }

    #[tokio::test]
    async fn test_cached_placeholder_preferred() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network).await;
        let key = worker.key_for("/images/placeholder.svg").unwrap();
        let stored = CachedResponse::new(200, vec![("content-type".into(), "image/svg+xml".into())], b"<svg/>".to_vec());
        worker.storage.put(&worker.config.names.images(), &key, &stored).await.unwrap();

        let response = worker.placeholder().await;
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"<svg/>");
    }

    #[tokio::test]
    async fn test_status_reports_partitions() {
        let worker = worker_with(ScriptedNetwork::new()).await;
        worker.handle_fetch(&get("/about")).await;

        let status = worker.status().await.unwrap();
        assert_eq!(status.version, "v1.1.0");
        assert_eq!(status.partitions.len(), 3);
        let dynamic = status.partitions.iter().find(|p| p.name == "portfolio-dynamic-v1.1.0").unwrap();
        assert_eq!(dynamic.entries, 1);
        assert_eq!(dynamic.limit, Some(30));
    }

    #[tokio::test]
    async fn test_shutdown_marks_redundant() {
        let worker = worker_with(ScriptedNetwork::new()).await;
        let mut rx = worker.subscribe();
        worker.shutdown().await;
        assert_eq!(*rx.borrow_and_update(), WorkerState::Redundant);
        assert!(!worker.is_controlling());
    }
}
