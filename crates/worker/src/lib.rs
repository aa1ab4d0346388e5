//! Offline controller for mcp-offline.
//!
//! This crate provides:
//! - Request classification and the four routing strategies
//! - Install/activate lifecycle over versioned cache partitions
//! - Synthesized offline fallbacks
//! - Event dispatch for install, activate, fetch, sync, push and
//!   notification clicks

pub mod classify;
pub mod config;
pub mod events;
pub mod fallback;
pub mod lifecycle;
pub mod response;
mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{RequestClass, classify};
pub use config::WorkerConfig;
pub use events::{
    BACKGROUND_SYNC_TAG, ClickReport, ClientAction, EventDispatcher, EventKind, EventOutcome, LifecycleEvent,
    Notification, NotificationAction, SyncReport, push_notification,
};
pub use lifecycle::{ActivateReport, InstallReport, PrecacheResult, WorkerState};
pub use response::{FetchDecision, Response, ResponseSource};
pub use worker::{PartitionStatus, Worker, WorkerStatus};
