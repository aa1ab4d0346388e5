//! SQLite-backed storage for named cache partitions.
//!
//! This module provides the cache-storage abstraction the offline controller
//! runs against, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named, versioned partitions that are created lazily on open
//! - Request-keyed entries hashed with SHA-256
//! - An explicit insertion sequence per entry for FIFO eviction
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::{CacheEntry, CachedResponse, RequestKey};
pub use names::{CacheNames, PartitionKind};
