//! The four routing strategies, one per [`RequestClass`](crate::RequestClass).

use shelter_client::FetchRequest;
use shelter_core::{Error, RequestKey};

use crate::fallback;
use crate::response::Response;
use crate::worker::Worker;

impl Worker {
    /// Cache-first for stylesheets, scripts and fonts.
    ///
    /// A hit is served immediately and refreshed in the background. A miss
    /// goes to the network without a timeout; a network failure is returned
    /// to the router.
    pub(crate) async fn serve_static(&self, request: &FetchRequest) -> Result<Response, Error> {
        let partition = self.config.names.static_assets();
        let key = RequestKey::get(request.url.as_str());

        if let Some(cached) = self.storage.match_entry(&partition, &key).await? {
            tracing::debug!(url = %request.url, "static cache hit");
            self.spawn_revalidation(partition, request.clone());
            return Ok(Response::from_cache(cached));
        }

        tracing::debug!(url = %request.url, "static cache miss");
        let response = self.network.fetch(request).await?;
        if response.ok() {
            self.store(&partition, &key, &response, None).await;
        }
        Ok(Response::from_network(response))
    }

    /// Cache-first for images, with no background refresh. Network failure
    /// or timeout yields the placeholder.
    pub(crate) async fn serve_image(&self, request: &FetchRequest) -> Result<Response, Error> {
        let partition = self.config.names.images();
        let key = RequestKey::get(request.url.as_str());

        if let Some(cached) = self.storage.match_entry(&partition, &key).await? {
            tracing::debug!(url = %request.url, "image cache hit");
            return Ok(Response::from_cache(cached));
        }

        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(&partition, &key, &response, Some(self.config.image_cache_limit)).await;
                }
                Ok(Response::from_network(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "image fetch failed, serving placeholder");
                Ok(self.placeholder().await)
            }
        }
    }

    /// Network-first for pages. Falls back to the cached copy, then to the
    /// offline page.
    pub(crate) async fn serve_page(&self, request: &FetchRequest) -> Result<Response, Error> {
        let partition = self.config.names.dynamic();
        let key = RequestKey::get(request.url.as_str());

        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(&partition, &key, &response, Some(self.config.dynamic_cache_limit)).await;
                }
                Ok(Response::from_network(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "page fetch failed, trying cache");
                match self.storage.match_entry(&partition, &key).await? {
                    Some(cached) => Ok(Response::from_cache(cached)),
                    None => Ok(fallback::offline_page()),
                }
            }
        }
    }

    /// Network-first for everything else. Falls back to the cached copy,
    /// then to a 503.
    pub(crate) async fn serve_dynamic(&self, request: &FetchRequest) -> Result<Response, Error> {
        let partition = self.config.names.dynamic();
        let key = RequestKey::get(request.url.as_str());

        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(&partition, &key, &response, Some(self.config.dynamic_cache_limit)).await;
                }
                Ok(Response::from_network(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "fetch failed, trying cache");
                match self.storage.match_entry(&partition, &key).await? {
                    Some(cached) => Ok(Response::from_cache(cached)),
                    None => Ok(fallback::offline_text()),
                }
            }
        }
    }
}
