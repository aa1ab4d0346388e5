//! Network side of mcp-offline.
//!
//! This crate provides the HTTP fetch pipeline the offline controller routes
//! through, behind the [`Network`] trait.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network, is_ok_status};
pub use reqwest::Method;
