//! Install and activate.
//!
//! State machine per instance:
//!
//! ```text
//! installing -> installed -> activating -> activated -> redundant
//! ```
//!
//! Install never blocks on a failed bulk write, and activation follows
//! immediately (skip-waiting).

use std::sync::atomic::Ordering;

use futures_util::future::try_join_all;
use serde::Serialize;
use shelter_client::FetchRequest;
use shelter_core::{CachedResponse, Error, RequestKey};

use crate::worker::Worker;

/// Lifecycle state of one controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Whether this state intercepts fetches.
    pub fn can_intercept(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Result of one partition's install-time bulk write.
#[derive(Debug, Clone, Serialize)]
pub struct PrecacheResult {
    pub partition: String,
    pub requested: usize,
    pub cached: usize,
    pub error: Option<String>,
}

impl PrecacheResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of the install event.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub static_assets: PrecacheResult,
    pub images: PrecacheResult,
    pub skip_waiting: bool,
}

impl InstallReport {
    pub fn succeeded(&self) -> bool {
        self.static_assets.succeeded() && self.images.succeeded()
    }
}

/// Outcome of the activate event.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub retained: Vec<String>,
    pub clients_claimed: bool,
}

impl Worker {
    pub(crate) fn set_state(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, version = self.config.names.version(), "worker state changed");
        }
    }

    /// Fetch every path and store all of them in `partition`, or none.
    ///
    /// Each fetch is bounded by the network timeout. Any transport failure,
    /// timeout or non-ok status aborts the whole write.
    pub(crate) async fn precache(&self, partition: &str, paths: &[String]) -> Result<usize, Error> {
        let keys = paths.iter().map(|path| self.key_for(path)).collect::<Result<Vec<_>, _>>()?;

        let fetches = keys.iter().map(|key| async move {
            let url = url::Url::parse(&key.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let response = self.fetch_with_timeout(&FetchRequest::get(url)).await?;
            if !response.ok() {
                return Err(Error::HttpError(format!("{} returned status {}", key.url, response.status.as_u16())));
            }
            Ok::<_, Error>((key.clone(), CachedResponse::from(&response)))
        });

        let items = try_join_all(fetches).await?;
        self.storage.open_partition(partition).await?;
        self.storage.put_all(partition, items).await
    }

    async fn precache_report(&self, partition: String, paths: Vec<String>) -> PrecacheResult {
        let requested = paths.len();
        match self.precache(&partition, &paths).await {
            Ok(cached) => PrecacheResult { partition, requested, cached, error: None },
            Err(e) => PrecacheResult { partition, requested, cached: 0, error: Some(e.to_string()) },
        }
    }

    /// Handle the install event.
    ///
    /// Populates `static` with the bootstrap manifest and `images` with the
    /// critical images, concurrently. Failures are logged and reported but
    /// the instance still reaches `installed` and asks to skip waiting.
    pub async fn install(&self) -> InstallReport {
        self.set_state(WorkerState::Installing);

        let names = &self.config.names;
        let (static_assets, images) = tokio::join!(
            self.precache_report(names.static_assets(), self.config.static_manifest.clone()),
            self.precache_report(names.images(), self.config.critical_image_paths()),
        );

        if images.succeeded() {
            self.enforce_limit(&images.partition, self.config.image_cache_limit).await;
        }

        let report = InstallReport { static_assets, images, skip_waiting: true };
        if report.succeeded() {
            tracing::info!(
                static_cached = report.static_assets.cached,
                images_cached = report.images.cached,
                "install complete"
            );
        } else {
            let error = Error::InstallFailed(
                [&report.static_assets, &report.images]
                    .iter()
                    .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.partition, e)))
                    .collect::<Vec<_>>()
                    .join("; "),
            );
            tracing::warn!(error = %error, "install failed, activating anyway");
        }

        self.set_state(WorkerState::Installed);
        report
    }

    /// Handle the activate event.
    ///
    /// Deletes every partition that is not one of the current three, makes
    /// sure the current ones exist, then claims all clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.set_state(WorkerState::Activating);

        let names = &self.config.names;
        let mut deleted = Vec::new();
        for name in self.storage.partition_names().await? {
            if !names.is_current(&name) {
                self.storage.delete_partition(&name).await?;
                tracing::info!(partition = %name, "deleted old cache partition");
                deleted.push(name);
            }
        }

        let retained = names.current();
        for name in &retained {
            self.storage.open_partition(name).await?;
        }

        self.claim_clients();
        self.set_state(WorkerState::Activated);

        Ok(ActivateReport { deleted, retained, clients_claimed: true })
    }

    /// Start controlling open clients without waiting for them to reload.
    pub(crate) fn claim_clients(&self) {
        self.controlling.store(true, Ordering::SeqCst);
    }
}
