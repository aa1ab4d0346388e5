//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the controller's partitions.

pub mod list;

pub use list::{CacheListParams, list_impl};
