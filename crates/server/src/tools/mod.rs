//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-offline server.

pub mod cache;
pub mod events;
pub mod offline_fetch;
pub mod status;

pub use cache::{CacheListParams, list_impl};
pub use events::{WorkerEventParams, event_impl};
pub use offline_fetch::{OfflineFetchParams, fetch_impl};
pub use status::status_impl;
