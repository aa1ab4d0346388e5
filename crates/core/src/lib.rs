//! Core types and shared functionality for mcp-offline.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, CacheNames, CacheStorage, CachedResponse, PartitionKind, RequestKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
