//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - a partition limit is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `cache_prefix`, `version` or `user_agent` is empty
    /// - `origin` is not an http(s) URL
    ///
    /// Returns `ConfigError::Missing` if `placeholder_path` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.image_cache_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "image_cache_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.dynamic_cache_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "dynamic_cache_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }
        if self.version.is_empty() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must not be empty".into() });
        }
        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.placeholder_path.is_empty() {
            return Err(ConfigError::Missing {
                field: "placeholder_path".into(),
                hint: "Set MCP_OFFLINE_PLACEHOLDER_PATH to a path such as /images/placeholder.svg".into(),
            });
        }

        self.origin_url()?;

        if self.static_manifest.is_empty() {
            tracing::warn!("static_manifest is empty; install will not pre-populate the static partition");
        }

        Ok(())
    }
}
