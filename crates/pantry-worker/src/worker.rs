//! Service Worker
//!
//! Owns the configuration, cache storage, network and host, tracks the
//! lifecycle state, and dispatches one handler per event kind.
//!
//! ## Event lifetime
//!
//! Each dispatched event holds a [`PendingEvent`] until its future resolves.
//! The host must not terminate the worker while [`ServiceWorker::pending_events`]
//! is non-zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use pantry_net::{CacheStorage, Network, Request};

use crate::config::WorkerConfig;
use crate::intercept::{FetchDecision, Interceptor};
use crate::lifecycle::{self, WorkerState};
use crate::notifications::{self, Notification, PushMessage, SyncOutcome};
use crate::platform::Platform;
use crate::WorkerError;

/// Events delivered by the host
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push(PushMessage),
    NotificationClick(Notification),
}

impl WorkerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Sync { .. } => "sync",
            WorkerEvent::Push(_) => "push",
            WorkerEvent::NotificationClick(_) => "notificationclick",
        }
    }
}

/// Result of a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed,
    Activated { deleted: Vec<String> },
    Fetch(FetchDecision),
    Sync(SyncOutcome),
    Push(Notification),
    NotificationClick,
}

/// Keeps the worker alive while an event is in flight
#[derive(Debug)]
pub struct PendingEvent {
    counter: Arc<AtomicUsize>,
}

impl PendingEvent {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for PendingEvent {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The offline worker
pub struct ServiceWorker<N, P> {
    config: WorkerConfig,
    storage: CacheStorage,
    network: N,
    platform: P,
    state: Mutex<WorkerState>,
    pending: Arc<AtomicUsize>,
}

impl<N: Network, P: Platform> ServiceWorker<N, P> {
    pub fn new(config: WorkerConfig, storage: CacheStorage, network: N, platform: P) -> Self {
        match config.base_url() {
            Ok(base) => storage.set_base(base),
            Err(e) => tracing::warn!("Cache keys stay unresolved: {}", e),
        }
        Self {
            config,
            storage,
            network,
            platform,
            state: Mutex::new(WorkerState::Parsed),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A worker restored from a previous run that already activated
    pub fn activated(config: WorkerConfig, storage: CacheStorage, network: N, platform: P) -> Self {
        let worker = Self::new(config, storage, network, platform);
        worker.set_state(WorkerState::Activated);
        worker
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Move from `expected` to `next`, failing if the worker is elsewhere
    fn transition(&self, expected: WorkerState, next: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != expected {
            return Err(WorkerError::InvalidState {
                expected,
                found: *state,
            });
        }
        *state = next;
        Ok(())
    }

    fn require(&self, expected: WorkerState) -> Result<(), WorkerError> {
        let found = self.state();
        if found == expected {
            Ok(())
        } else {
            Err(WorkerError::InvalidState { expected, found })
        }
    }

    /// Events currently holding the worker alive
    pub fn pending_events(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn can_terminate(&self) -> bool {
        self.pending_events() == 0
    }

    fn hold(&self) -> PendingEvent {
        PendingEvent::new(&self.pending)
    }

    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, WorkerError> {
        tracing::debug!("Dispatching {} event", event.kind());

        match event {
            WorkerEvent::Install => self.install().await.map(|()| EventOutcome::Installed),
            WorkerEvent::Activate => self
                .activate()
                .await
                .map(|deleted| EventOutcome::Activated { deleted }),
            WorkerEvent::Fetch(request) => Ok(EventOutcome::Fetch(self.fetch(&request).await)),
            WorkerEvent::Sync { tag } => self.sync(&tag).await.map(EventOutcome::Sync),
            WorkerEvent::Push(message) => self.push(&message).await.map(EventOutcome::Push),
            WorkerEvent::NotificationClick(notification) => self
                .notification_click(&notification)
                .await
                .map(|()| EventOutcome::NotificationClick),
        }
    }

    pub async fn install(&self) -> Result<(), WorkerError> {
        let _pending = self.hold();
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        tracing::info!("Service worker installing...");

        if let Err(e) = lifecycle::install(&self.config, &self.storage, &self.network).await {
            tracing::error!("Service worker installation failed: {}", e);
            self.set_state(WorkerState::Redundant);
            return Err(e.into());
        }

        self.set_state(WorkerState::Installed);
        tracing::info!("Service worker installed");

        if let Err(e) = self.platform.skip_waiting().await {
            tracing::warn!("skip_waiting failed, waiting for clients to close: {}", e);
        }
        Ok(())
    }

    /// Returns the names of the caches that were deleted
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        let _pending = self.hold();
        self.transition(WorkerState::Installed, WorkerState::Activating)?;
        tracing::info!("Service worker activating...");

        let result = lifecycle::activate(&self.config, &self.storage, &self.platform).await;

        // Activation stands even if claiming clients fails
        self.set_state(WorkerState::Activated);
        let deleted = result?;
        tracing::info!("Service worker activated");
        Ok(deleted)
    }

    /// Install, then activate straight away
    pub async fn start(&self) -> Result<Vec<String>, WorkerError> {
        self.install().await?;
        self.activate().await
    }

    /// Only an activated worker controls fetches
    pub async fn fetch(&self, request: &Request) -> FetchDecision {
        let _pending = self.hold();
        if self.state() != WorkerState::Activated {
            return FetchDecision::Passthrough;
        }

        Interceptor::new(&self.config, &self.storage, &self.network)
            .handle(request)
            .await
    }

    pub async fn sync(&self, tag: &str) -> Result<SyncOutcome, WorkerError> {
        let _pending = self.hold();
        self.require(WorkerState::Activated)?;
        Ok(notifications::handle_sync(&self.config, tag).await)
    }

    pub async fn push(&self, message: &PushMessage) -> Result<Notification, WorkerError> {
        let _pending = self.hold();
        self.require(WorkerState::Activated)?;
        Ok(notifications::handle_push(&self.config, &self.platform, message).await?)
    }

    pub async fn notification_click(&self, notification: &Notification) -> Result<(), WorkerError> {
        let _pending = self.hold();
        self.require(WorkerState::Activated)?;
        Ok(notifications::handle_notification_click(&self.config, &self.platform, notification).await?)
    }
}
