//! Pantry Networking
//!
//! Request/response model, named cache storage and the network seam used by
//! the offline worker.

pub mod cache;
pub mod fetch;
pub mod loader;

pub use cache::{Cache, CacheHandle, CacheStats, CacheStorage, RequestKey, StorageSnapshot};
pub use fetch::{HttpNetwork, Network, NetworkConfig};
pub use loader::{Headers, Method, Request, Response, ResponseType};
pub use url::Url;

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
