//! Controllers pointed at a mock origin for tool tests.

use std::sync::Arc;
use std::time::Duration;

use shelter_client::{FetchClient, FetchConfig, Network};
use shelter_core::CacheStorage;
use shelter_worker::{EventDispatcher, Worker, WorkerConfig};
use url::Url;
use wiremock::MockServer;

/// A controller whose origin is the mock server, not yet installed.
pub(crate) async fn worker_for(server: &MockServer) -> (Arc<Worker>, Arc<dyn Network>) {
    let origin = Url::parse(&server.uri()).unwrap();
    let config = WorkerConfig::for_origin(origin).with_network_timeout(Duration::from_millis(250));
    let storage = CacheStorage::open_in_memory().await.unwrap();
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
    (Arc::new(Worker::new(config, storage, Arc::clone(&network))), network)
}

/// Same as [`worker_for`], installed and activated.
pub(crate) async fn started_worker_for(server: &MockServer) -> (Arc<Worker>, Arc<dyn Network>, EventDispatcher) {
    let (worker, network) = worker_for(server).await;
    let dispatcher = EventDispatcher::new();
    dispatcher.start(&worker).await.unwrap();
    (worker, network, dispatcher)
}
