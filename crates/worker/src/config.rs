//! Controller configuration.

use std::time::Duration;

use shelter_core::{AppConfig, CacheNames, ConfigError};
use url::Url;

/// Everything the controller needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Origin whose requests are intercepted.
    pub origin: Url,
    /// Versioned partition names.
    pub names: CacheNames,
    /// Timeout raced against image, page and generic network requests.
    pub network_timeout: Duration,
    pub image_cache_limit: usize,
    pub dynamic_cache_limit: usize,
    /// Paths stored in the static partition at install.
    pub static_manifest: Vec<String>,
    /// Paths stored in the images partition at install.
    pub critical_images: Vec<String>,
    /// Key of the cached placeholder image.
    pub placeholder_path: String,
}

impl WorkerConfig {
    /// Build from the loaded application configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin does not parse.
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            origin: config.origin_url()?,
            names: config.cache_names(),
            network_timeout: config.timeout(),
            image_cache_limit: config.image_cache_limit,
            dynamic_cache_limit: config.dynamic_cache_limit,
            static_manifest: config.static_manifest.clone(),
            critical_images: config.critical_images.clone(),
            placeholder_path: config.placeholder_path.clone(),
        })
    }

    /// Default settings for the given origin.
    pub fn for_origin(origin: Url) -> Self {
        let defaults = AppConfig::default();
        Self {
            origin,
            names: defaults.cache_names(),
            network_timeout: defaults.timeout(),
            image_cache_limit: defaults.image_cache_limit,
            dynamic_cache_limit: defaults.dynamic_cache_limit,
            static_manifest: defaults.static_manifest,
            critical_images: defaults.critical_images,
            placeholder_path: defaults.placeholder_path,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.names = CacheNames::new(self.names.prefix(), version);
        self
    }

    #[must_use]
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, images: usize, dynamic: usize) -> Self {
        self.image_cache_limit = images;
        self.dynamic_cache_limit = dynamic;
        self
    }

    /// Critical images with empty entries removed.
    pub fn critical_image_paths(&self) -> Vec<String> {
        self.critical_images.iter().filter(|p| !p.trim().is_empty()).cloned().collect()
    }
}
