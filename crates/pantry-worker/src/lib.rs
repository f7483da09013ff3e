//! Pantry Offline Worker
//!
//! Offline cache for the grocery-list web app: static assets are pre-cached
//! at install, GET requests are answered cache-first, good same-origin
//! network responses are kept in a dynamic cache, and an offline page is
//! synthesized when nothing else can answer.
//!
//! ```no_run
//! use pantry_net::{CacheStorage, HttpNetwork, NetworkConfig, Request};
//! use pantry_worker::{ConsolePlatform, ServiceWorker, WorkerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = HttpNetwork::new(NetworkConfig::default())?;
//! let worker = ServiceWorker::new(WorkerConfig::default(), CacheStorage::new(), network, ConsolePlatform);
//!
//! smol::block_on(async {
//!     worker.start().await?;
//!     let decision = worker.fetch(&Request::get("/index.html")).await;
//!     println!("{:?}", decision.source());
//!     Ok::<_, pantry_worker::WorkerError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod intercept;
pub mod lifecycle;
pub mod notifications;
pub mod offline;
pub mod platform;
pub mod worker;

pub use config::{ConfigError, NotificationDefaults, WorkerConfig};
pub use intercept::{FetchDecision, FetchSource, Interceptor};
pub use lifecycle::{InstallError, WorkerState};
pub use notifications::{Notification, NotificationOptions, PushMessage, SyncOutcome, TextDirection};
pub use platform::{ConsolePlatform, Platform, PlatformError};
pub use worker::{EventOutcome, PendingEvent, ServiceWorker, WorkerEvent};

/// Worker errors
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Installation failed: {0}")]
    Install(#[from] InstallError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Invalid worker state: expected {expected}, found {found}")]
    InvalidState {
        expected: WorkerState,
        found: WorkerState,
    },
}
