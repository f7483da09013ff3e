//! Fetch Interception
//!
//! Cache-first policy: answer from the static or dynamic cache, otherwise
//! go to the network and keep a copy of good same-origin responses, otherwise
//! synthesize an offline response.

use pantry_net::{CacheStorage, Network, Request, Response};

use crate::config::WorkerConfig;
use crate::offline;

/// Where an intercepted response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
    /// Synthesized after a network failure
    Offline,
}

/// What the worker does with a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDecision {
    /// Not intercepted; the host performs the fetch itself
    Passthrough,
    Respond { response: Response, source: FetchSource },
}

impl FetchDecision {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchDecision::Passthrough)
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchDecision::Respond { response, .. } => Some(response),
            FetchDecision::Passthrough => None,
        }
    }

    pub fn source(&self) -> Option<FetchSource> {
        match self {
            FetchDecision::Respond { source, .. } => Some(*source),
            FetchDecision::Passthrough => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchDecision::Respond { response, .. } => Some(response),
            FetchDecision::Passthrough => None,
        }
    }
}

/// Applies the cache policy to one request at a time
pub struct Interceptor<'a, N> {
    config: &'a WorkerConfig,
    storage: &'a CacheStorage,
    network: &'a N,
}

impl<'a, N: Network> Interceptor<'a, N> {
    pub fn new(config: &'a WorkerConfig, storage: &'a CacheStorage, network: &'a N) -> Self {
        Self {
            config,
            storage,
            network,
        }
    }

    /// Only GET requests outside extension schemes are intercepted
    pub fn should_intercept(&self, request: &Request) -> bool {
        if request.method != pantry_net::Method::Get {
            return false;
        }
        match request.scheme() {
            Some(scheme) => !self
                .config
                .ignored_schemes
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(scheme)),
            None => true,
        }
    }

    pub async fn handle(&self, request: &Request) -> FetchDecision {
        if !self.should_intercept(request) {
            tracing::debug!("Passing through {} {}", request.method, request.url);
            return FetchDecision::Passthrough;
        }

        let (response, source) = self.respond(request).await;
        FetchDecision::Respond { response, source }
    }

    async fn respond(&self, request: &Request) -> (Response, FetchSource) {
        let preferred = self.config.current_caches();
        if let Some(cached) = self.storage.match_request(request, &preferred) {
            tracing::debug!("Serving from cache {}", request.url);
            return (cached, FetchSource::Cache);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.status == 200 && response.is_basic() {
                    self.cache_dynamic(request, response.clone());
                }
                (response, FetchSource::Network)
            }
            Err(e) => {
                tracing::warn!("Fetch failed for {}, serving offline response: {}", request.url, e);
                (offline::fallback_for(request), FetchSource::Offline)
            }
        }
    }

    fn cache_dynamic(&self, request: &Request, response: Response) {
        tracing::debug!("Caching dynamic content {}", request.url);
        self.storage
            .open_with_limit(&self.config.dynamic_cache, self.config.dynamic_cache_limit)
            .put(request, response);
    }
}
