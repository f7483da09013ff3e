//! Worker Configuration
//!
//! Cache names, the static asset list and notification defaults. Bumping
//! the version in the cache names is how a deployment invalidates the
//! previous worker's caches.

use std::path::Path;

use pantry_net::Url;
use serde::{Deserialize, Serialize};

use crate::notifications::TextDirection;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Immutable worker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the worker serves; cache keys resolve relative URLs against it
    pub origin: String,
    /// Legacy application cache name; activation does not keep it
    pub app_cache: String,
    /// Cache populated at install time
    pub static_cache: String,
    /// Cache populated from live network responses
    pub dynamic_cache: String,
    /// URLs written to the static cache during install
    pub static_assets: Vec<String>,
    /// Entry bound for the dynamic cache (`None` = unbounded)
    pub dynamic_cache_limit: Option<usize>,
    /// URL schemes that are never intercepted
    pub ignored_schemes: Vec<String>,
    /// Background sync tag the worker acknowledges
    pub sync_tag: String,
    /// URL opened when a notification is clicked
    pub root_url: String,
    pub notification: NotificationDefaults,
}

/// Defaults for notifications built from push messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub dir: TextDirection,
    pub lang: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "רשימת קניות".into(),
            body: "רשימת קניות עודכנה".into(),
            icon: "/icon-192.png".into(),
            badge: "/icon-72.png".into(),
            dir: TextDirection::Rtl,
            lang: "he".into(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".into(),
            app_cache: "grocery-app-v1.0.0".into(),
            static_cache: "grocery-app-static-v1.0.0".into(),
            dynamic_cache: "grocery-app-dynamic-v1.0.0".into(),
            static_assets: vec![
                "/".into(),
                "/index.html".into(),
                "/manifest.json".into(),
                "/icon-192.png".into(),
                "/icon-512.png".into(),
            ],
            dynamic_cache_limit: None,
            ignored_schemes: vec![
                "chrome-extension".into(),
                "moz-extension".into(),
                "safari-web-extension".into(),
            ],
            sync_tag: "grocery-sync".into(),
            root_url: "/".into(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.static_cache.is_empty() || self.dynamic_cache.is_empty() {
            return Err(ConfigError::Invalid("cache names must not be empty".into()));
        }
        if self.static_cache == self.dynamic_cache {
            return Err(ConfigError::Invalid(format!(
                "static and dynamic caches share the name {}",
                self.static_cache
            )));
        }
        if self.static_assets.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid("static asset URLs must not be empty".into()));
        }
        Ok(())
    }

    /// The origin as a URL relative cache keys are joined onto
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid(format!("origin {}: {}", self.origin, e)))
    }

    /// Names activation keeps; every other cache is deleted
    pub fn current_caches(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.dynamic_cache.as_str()]
    }

    /// Use `version` as the suffix of all three cache names
    pub fn with_version(mut self, version: &str) -> Self {
        self.app_cache = format!("grocery-app-{}", version);
        self.static_cache = format!("grocery-app-static-{}", version);
        self.dynamic_cache = format!("grocery-app-dynamic-{}", version);
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn with_static_cache(mut self, name: &str) -> Self {
        self.static_cache = name.to_string();
        self
    }

    pub fn with_dynamic_cache(mut self, name: &str) -> Self {
        self.dynamic_cache = name.to_string();
        self
    }

    pub fn with_static_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dynamic_cache_limit(mut self, limit: Option<usize>) -> Self {
        self.dynamic_cache_limit = limit;
        self
    }
}
