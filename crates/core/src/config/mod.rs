//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MCP_OFFLINE_*)
//! 2. TOML config file (if MCP_OFFLINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MCP_OFFLINE_*)
/// 2. TOML config file (if MCP_OFFLINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via MCP_OFFLINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the controller intercepts requests for.
    ///
    /// Set via MCP_OFFLINE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every partition name.
    ///
    /// Set via MCP_OFFLINE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token embedded in partition names. Bumping it orphans
    /// every partition of the previous version.
    ///
    /// Set via MCP_OFFLINE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Network timeout for image, page and generic requests, in milliseconds.
    ///
    /// Set via MCP_OFFLINE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum entries kept in the images partition.
    #[serde(default = "default_image_cache_limit")]
    pub image_cache_limit: usize,

    /// Maximum entries kept in the dynamic partition.
    #[serde(default = "default_dynamic_cache_limit")]
    pub dynamic_cache_limit: usize,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via MCP_OFFLINE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via MCP_OFFLINE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Paths eagerly stored in the static partition at install.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Paths eagerly stored in the images partition at install.
    /// Empty entries are skipped.
    #[serde(default = "default_critical_images")]
    pub critical_images: Vec<String>,

    /// Well-known key of the cached placeholder image.
    #[serde(default = "default_placeholder_path")]
    pub placeholder_path: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mcp-offline-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "portfolio".into()
}

fn default_version() -> String {
    "v1.1.0".into()
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_image_cache_limit() -> usize {
    50
}

fn default_dynamic_cache_limit() -> usize {
    30
}

fn default_user_agent() -> String {
    "mcp-offline/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/about.html",
        "/projects.html",
        "/contact.html",
        "/css/styles.css",
        "/css/responsive.css",
        "/js/main.js",
        "/js/navigation.js",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_critical_images() -> Vec<String> {
    [
        "/images/profile.jpg",
        "/images/hero-bg.jpg",
        "/images/logo.svg",
        "/images/placeholder.svg",
        "/images/icons/icon-192.png",
        "/images/icons/icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_placeholder_path() -> String {
    "/images/placeholder.svg".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            timeout_ms: default_timeout_ms(),
            image_cache_limit: default_image_cache_limit(),
            dynamic_cache_limit: default_dynamic_cache_limit(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            static_manifest: default_static_manifest(),
            critical_images: default_critical_images(),
            placeholder_path: default_placeholder_path(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Partition names for the configured prefix and version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MCP_OFFLINE_`
    /// 2. TOML file from `MCP_OFFLINE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MCP_OFFLINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MCP_OFFLINE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse the configured origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL with a host.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL with a host".into() });
        }

        Ok(parsed)
    }
}
