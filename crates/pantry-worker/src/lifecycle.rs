//! Worker Lifecycle
//!
//! Install pre-caches the static assets; activate removes caches left over
//! from earlier versions and claims open clients.

use std::fmt;

use pantry_net::{CacheHandle, CacheStorage, NetError, Network, Request};

use crate::config::WorkerConfig;
use crate::platform::{Platform, PlatformError};

/// Service worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the worker never serves
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        })
    }
}

/// Install errors
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: NetError,
    },

    #[error("Unexpected status {status} for {url}")]
    BadStatus { url: String, status: u16 },
}

/// Fetch every static asset and store them all, or none of them.
pub async fn install<N: Network>(
    config: &WorkerConfig,
    storage: &CacheStorage,
    network: &N,
) -> Result<CacheHandle, InstallError> {
    let cache = storage.open(&config.static_cache);
    tracing::info!("Caching {} static files into {}", config.static_assets.len(), cache.name());

    let mut fetched = Vec::with_capacity(config.static_assets.len());
    for url in &config.static_assets {
        let request = Request::get(url);
        let response = network
            .fetch(&request)
            .await
            .map_err(|source| InstallError::Fetch {
                url: url.clone(),
                source,
            })?;

        if !response.ok() {
            return Err(InstallError::BadStatus {
                url: url.clone(),
                status: response.status,
            });
        }
        fetched.push((request, response));
    }

    cache.put_all(fetched);
    Ok(cache)
}

/// Delete every cache that is not current, returning the deleted names
pub fn remove_stale_caches(config: &WorkerConfig, storage: &CacheStorage) -> Vec<String> {
    let current = config.current_caches();
    let stale: Vec<String> = storage
        .keys()
        .into_iter()
        .filter(|name| !current.contains(&name.as_str()))
        .collect();

    for name in &stale {
        tracing::info!("Deleting old cache {}", name);
        storage.delete(name);
    }
    stale
}

pub async fn activate<P: Platform>(
    config: &WorkerConfig,
    storage: &CacheStorage,
    platform: &P,
) -> Result<Vec<String>, PlatformError> {
    let deleted = remove_stale_caches(config, storage);
    platform.claim_clients().await?;
    Ok(deleted)
}
