//! Lifecycle event dispatch.
//!
//! The host delivers each event once and awaits the future its handler
//! returns before treating the event as processed.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use shelter_client::FetchRequest;
use shelter_core::Error;

use crate::lifecycle::{ActivateReport, InstallReport};
use crate::response::FetchDecision;
use crate::worker::Worker;

/// Sync tag that refreshes the app shell.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// An event delivered by the host.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
    Sync { tag: String },
    Push { data: Option<String> },
    NotificationClick { action: Option<String> },
}

/// Discriminant used as the dispatch table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Sync,
    Push,
    NotificationClick,
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::Install => EventKind::Install,
            LifecycleEvent::Activate => EventKind::Activate,
            LifecycleEvent::Fetch(_) => EventKind::Fetch,
            LifecycleEvent::Sync { .. } => EventKind::Sync,
            LifecycleEvent::Push { .. } => EventKind::Push,
            LifecycleEvent::NotificationClick { .. } => EventKind::NotificationClick,
        }
    }
}

/// Action button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Notification the host should display for a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
}

/// What the host should do with its clients after a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    OpenWindow { url: String },
}

/// Outcome of a sync event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tag: String,
    pub ran: bool,
    pub refreshed: usize,
}

/// Outcome of a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickReport {
    pub closed: bool,
    pub client_action: Option<ClientAction>,
}

/// What a handler settled with.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchDecision),
    Synced(SyncReport),
    Notify(Notification),
    Clicked(ClickReport),
}

/// A handler: takes the worker and the event, returns the deferred
/// completion the host waits on.
pub type EventHandler = fn(Arc<Worker>, LifecycleEvent) -> BoxFuture<'static, Result<EventOutcome, Error>>;

/// Table mapping event kinds to handlers.
pub struct EventDispatcher {
    handlers: HashMap<EventKind, EventHandler>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        let mut dispatcher = Self { handlers: HashMap::new() };
        dispatcher.register(EventKind::Install, on_install);
        dispatcher.register(EventKind::Activate, on_activate);
        dispatcher.register(EventKind::Fetch, on_fetch);
        dispatcher.register(EventKind::Sync, on_sync);
        dispatcher.register(EventKind::Push, on_push);
        dispatcher.register(EventKind::NotificationClick, on_notification_click);
        dispatcher
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the handler for `kind`.
    pub fn register(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Deliver one event and wait for its handler to settle.
    pub async fn dispatch(&self, worker: &Arc<Worker>, event: LifecycleEvent) -> Result<EventOutcome, Error> {
        let kind = event.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| Error::InvalidInput(format!("no handler registered for {kind:?}")))?;
        handler(Arc::clone(worker), event).await
    }

    /// Run install, then activate straight away (skip-waiting).
    pub async fn start(&self, worker: &Arc<Worker>) -> Result<(InstallReport, ActivateReport), Error> {
        let install = match self.dispatch(worker, LifecycleEvent::Install).await? {
            EventOutcome::Installed(report) => report,
            other => return Err(Error::InvalidInput(format!("install handler returned {other:?}"))),
        };
        let activate = match self.dispatch(worker, LifecycleEvent::Activate).await? {
            EventOutcome::Activated(report) => report,
            other => return Err(Error::InvalidInput(format!("activate handler returned {other:?}"))),
        };
        Ok((install, activate))
    }
}

fn on_install(worker: Arc<Worker>, _event: LifecycleEvent) -> BoxFuture<'static, Result<EventOutcome, Error>> {
    async move { Ok(EventOutcome::Installed(worker.install().await)) }.boxed()
}

fn on_activate(worker: Arc<Worker>, _event: LifecycleEvent) -> BoxFuture<'static, Result<EventOutcome, Error>> {
    async move { worker.activate().await.map(EventOutcome::Activated) }.boxed()
}

fn on_fetch(worker: Arc<Worker>, event: LifecycleEvent) -> BoxFuture<'static, Result<EventOutcome, Error>> {
    async move {
        let LifecycleEvent::Fetch(request) = event else {
            return Err(Error::InvalidInput("fetch handler received a non-fetch event".into()));
        };
        // Clients are only controlled once this instance has claimed them.
        if !worker.is_controlling() {
            return Ok(EventOutcome::Fetched(FetchDecision::Passthrough));
        }
        Ok(EventOutcome::Fetched(worker.handle_fetch(&request).await))
    }
    .boxed()
}

fn on_sync(worker: Arc<Worker>, event: LifecycleEvent) -> BoxFuture<'static, Result<EventOutcome, Error>> {
    async move {
        let LifecycleEvent::Sync { tag } = event else {
            return Err(Error::InvalidInput("sync handler received a non-sync event".into()));
        };
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag = %tag, "ignoring sync tag");
            return Ok(EventOutcome::Synced(SyncReport { tag, ran: false, refreshed: 0 }));
        }

        let partition = worker.config().names.static_assets();
        let refreshed = match worker.precache(&partition, &worker.config().static_manifest).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!(error = %e, "background sync refresh failed");
                0
            }
        };
        Ok(EventOutcome::Synced(SyncReport { tag, ran: true, refreshed }))
    }
    .boxed()
}

fn on_push(_worker: Arc<Worker>, event: LifecycleEvent) -> BoxFuture<'static, Result<EventOutcome, Error>> {
    async move {
        let LifecycleEvent::Push { data } = event else {
            return Err(Error::InvalidInput("push handler received a non-push event".into()));
        };
        Ok(EventOutcome::Notify(push_notification(data.as_deref())))
    }
    .boxed()
}

fn on_notification_click(
    _worker: Arc<Worker>, event: LifecycleEvent,
) -> BoxFuture<'static, Result<EventOutcome, Error>> {
    async move {
        let LifecycleEvent::NotificationClick { action } = event else {
            return Err(Error::InvalidInput("notificationclick handler received another event".into()));
        };
        let client_action = match action.as_deref() {
            Some("explore") => Some(ClientAction::OpenWindow { url: "/".into() }),
            _ => None,
        };
        Ok(EventOutcome::Clicked(ClickReport { closed: true, client_action }))
    }
    .boxed()
}

/// Notification shown for a push message.
pub fn push_notification(data: Option<&str>) -> Notification {
    let body = match data {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => "New content available".to_string(),
    };

    Notification {
        title: "Portfolio Update".into(),
        body,
        icon: "/images/icons/icon-192.png".into(),
        badge: "/images/icons/icon-72.png".into(),
        vibrate: vec![100, 50, 100],
        actions: vec![
            NotificationAction { action: "explore".into(), title: "View Portfolio".into() },
            NotificationAction { action: "close".into(), title: "Close".into() },
        ],
    }
}
