//! Network Fetch
//!
//! The [`Network`] seam the worker fetches through, and an HTTP
//! implementation backed by reqwest.

use std::sync::Arc;
use std::time::Duration;

use url::{Origin, Url};

use crate::{Headers, NetError, Request, Response, ResponseType};

/// Something that can perform a live fetch
#[allow(async_fn_in_trait)]
pub trait Network {
    /// Fetch a request. `Err` means the fetch itself failed (offline, DNS,
    /// connection reset); HTTP error statuses are `Ok` responses.
    async fn fetch(&self, request: &Request) -> Result<Response, NetError>;
}

impl<N: Network + ?Sized> Network for &N {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        (**self).fetch(request).await
    }
}

impl<N: Network + ?Sized> Network for Arc<N> {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        (**self).fetch(request).await
    }
}

/// HTTP network configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Origin the worker is registered for; relative URLs resolve against it
    pub origin: String,
    /// User agent string
    pub user_agent: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".into(),
            user_agent: format!("pantry-worker/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Network backed by a blocking reqwest client on smol's thread pool
pub struct HttpNetwork {
    base: Url,
    origin: Origin,
    client: reqwest::blocking::Client,
}

impl HttpNetwork {
    pub fn new(config: NetworkConfig) -> Result<Self, NetError> {
        let base = Url::parse(&config.origin)
            .map_err(|e| NetError::InvalidUrl(format!("{}: {}", config.origin, e)))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| NetError::Network(e.to_string()))?;

        Ok(Self {
            origin: base.origin(),
            base,
            client,
        })
    }

    /// Resolve a request URL against the worker's origin
    pub fn resolve(&self, url: &str) -> Result<Url, NetError> {
        self.base
            .join(url)
            .map_err(|e| NetError::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        let url = self.resolve(&request.url)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| NetError::UnsupportedMethod(request.method.to_string()))?;

        tracing::info!("HTTP {} {}", request.method, url);

        let client = self.client.clone();
        let origin = self.origin.clone();
        let headers = request.headers.clone();
        let body = request.body.clone();

        smol::unblock(move || -> Result<Response, NetError> {
            let mut builder = client.request(method, url);
            for (name, value) in headers.iter() {
                builder = builder.header(name, value);
            }
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let response = builder.send().map_err(|e| NetError::Network(e.to_string()))?;

            let status = response.status();
            let response_type = if response.url().origin() == origin {
                ResponseType::Basic
            } else {
                ResponseType::Cors
            };
            let headers: Headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response
                .bytes()
                .map_err(|e| NetError::Network(e.to_string()))?
                .to_vec();

            Ok(Response {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
                response_type,
            })
        })
        .await
    }
}
