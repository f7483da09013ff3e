//! Named Cache Storage
//!
//! Request/response caches addressed by name, shared between concurrently
//! running worker events. Every operation takes the storage lock once and
//! releases it before returning, so reads and writes are atomic per call.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Method, NetError, Request, Response};

/// Normalized request identity used as a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: Method, url: &str) -> Self {
        // Fragments never reach the server, so they never split cache entries
        let url = url.split_once('#').map_or(url, |(base, _)| base);
        Self {
            method,
            url: url.to_string(),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method, &request.url)
    }

    /// Key with the URL resolved against `base`, so `/index.html` and
    /// `https://shop.example/index.html` name the same entry
    pub fn resolved(request: &Request, base: Option<&Url>) -> Self {
        let Some(mut url) = base.and_then(|base| base.join(&request.url).ok()) else {
            return Self::from_request(request);
        };
        url.set_fragment(None);
        Self {
            method: request.method,
            url: url.into(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: Response,
    inserted: u64,
    last_accessed: u64,
}

/// A single named cache
#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: HashMap<RequestKey, CacheEntry>,
    max_entries: Option<usize>,
    clock: u64,
    total_size: usize,
}

impl Cache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `max_entries` responses
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.max_entries
    }

    /// Change the entry limit, evicting down to it if needed
    pub fn set_limit(&mut self, max_entries: Option<usize>) {
        self.max_entries = max_entries;
        if let Some(max) = max_entries {
            while self.entries.len() > max {
                if !self.evict_one() {
                    break;
                }
            }
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Store a response, replacing any previous one for the same key
    pub fn put(&mut self, key: RequestKey, response: Response) {
        let now = self.tick();
        let size = response.body.len();

        let inserted = match self.entries.remove(&key) {
            Some(existing) => {
                self.total_size = self.total_size.saturating_sub(existing.response.body.len());
                existing.inserted
            }
            None => {
                if let Some(max) = self.max_entries {
                    if max == 0 {
                        return;
                    }
                    while self.entries.len() >= max {
                        if !self.evict_one() {
                            break;
                        }
                    }
                }
                now
            }
        };

        self.entries.insert(
            key,
            CacheEntry {
                response,
                inserted,
                last_accessed: now,
            },
        );
        self.total_size += size;
    }

    /// Get a cached response, marking it as recently used
    pub fn get(&mut self, key: &RequestKey) -> Option<&Response> {
        let now = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed = now;
        Some(&entry.response)
    }

    /// Get a cached response without touching its recency
    pub fn peek(&self, key: &RequestKey) -> Option<&Response> {
        self.entries.get(key).map(|e| &e.response)
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn delete(&mut self, key: &RequestKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_size = self.total_size.saturating_sub(entry.response.body.len());
                true
            }
            None => false,
        }
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<_> = self.entries.iter().map(|(k, e)| (e.inserted, k)).collect();
        keys.sort_by_key(|(inserted, _)| *inserted);
        keys.into_iter().map(|(_, k)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }

    /// Evict the least recently used entry
    fn evict_one(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_accessed)
            .map(|(k, _)| k.clone());

        match oldest {
            Some(key) => {
                tracing::debug!("Evicting {} from cache", key);
                self.delete(&key)
            }
            None => false,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            total_size: self.total_size,
            max_entries: self.max_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size: usize,
    pub max_entries: Option<usize>,
}

#[derive(Debug, Default)]
struct StorageInner {
    // Creation order matters for cross-cache lookups
    caches: Vec<(String, Cache)>,
    base: Option<Url>,
}

impl StorageInner {
    fn key(&self, request: &Request) -> RequestKey {
        RequestKey::resolved(request, self.base.as_ref())
    }

    fn find(&self, name: &str) -> Option<&Cache> {
        self.caches.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Cache> {
        self.caches.iter_mut().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    fn open(&mut self, name: &str) -> &mut Cache {
        let index = match self.caches.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                tracing::debug!("Creating cache {}", name);
                self.caches.push((name.to_string(), Cache::new()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[index].1
    }
}

/// Shared storage of named caches
///
/// Cloning yields another handle to the same storage.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    inner: Arc<Mutex<StorageInner>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StorageInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a cache, creating it if absent
    pub fn open(&self, name: &str) -> CacheHandle {
        self.lock().open(name);
        CacheHandle {
            storage: self.clone(),
            name: name.to_string(),
        }
    }

    /// Open a cache and apply an entry limit to it
    pub fn open_with_limit(&self, name: &str, max_entries: Option<usize>) -> CacheHandle {
        self.lock().open(name).set_limit(max_entries);
        CacheHandle {
            storage: self.clone(),
            name: name.to_string(),
        }
    }

    /// Resolve relative request URLs against `base` when building keys
    pub fn set_base(&self, base: Url) {
        self.lock().base = Some(base);
    }

    pub fn base(&self) -> Option<Url> {
        self.lock().base.clone()
    }

    pub fn has(&self, name: &str) -> bool {
        self.lock().find(name).is_some()
    }

    /// Delete a cache
    pub fn delete(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let before = inner.caches.len();
        inner.caches.retain(|(n, _)| n != name);
        inner.caches.len() != before
    }

    /// Get all cache names, in creation order
    pub fn keys(&self) -> Vec<String> {
        self.lock().caches.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Look a request up across caches.
    ///
    /// Caches named in `preferred` are searched first, in that order; the
    /// rest follow in creation order.
    pub fn match_request(&self, request: &Request, preferred: &[&str]) -> Option<Response> {
        let mut inner = self.lock();
        let key = inner.key(request);

        for name in preferred {
            if let Some(response) = inner.find_mut(name).and_then(|c| c.get(&key)) {
                return Some(response.clone());
            }
        }

        inner
            .caches
            .iter_mut()
            .filter(|(n, _)| !preferred.contains(&n.as_str()))
            .find_map(|(_, c)| c.get(&key).cloned())
    }

    /// Stats for one cache
    pub fn stats(&self, name: &str) -> Option<CacheStats> {
        self.lock().find(name).map(Cache::stats)
    }

    pub fn snapshot(&self) -> StorageSnapshot {
        let inner = self.lock();
        let caches = inner
            .caches
            .iter()
            .map(|(name, cache)| CacheSnapshot {
                name: name.clone(),
                max_entries: cache.limit(),
                entries: cache
                    .keys()
                    .into_iter()
                    .filter_map(|key| {
                        let response = cache.peek(&key)?.clone();
                        Some(SnapshotEntry { request: key, response })
                    })
                    .collect(),
            })
            .collect();

        StorageSnapshot { caches }
    }

    pub fn restore(snapshot: StorageSnapshot) -> Self {
        let mut inner = StorageInner::default();
        for cached in snapshot.caches {
            let cache = inner.open(&cached.name);
            cache.set_limit(cached.max_entries);
            for entry in cached.entries {
                cache.put(entry.request, entry.response);
            }
        }

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Write all caches to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        let json = serde_json::to_vec_pretty(&self.snapshot())?;
        std::fs::write(path.as_ref(), json)?;
        tracing::debug!("Saved cache storage to {}", path.as_ref().display());
        Ok(())
    }

    /// Read caches from a JSON file; a missing file yields empty storage
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)?;
        let snapshot: StorageSnapshot = serde_json::from_slice(&bytes)?;
        Ok(Self::restore(snapshot))
    }
}

/// Handle to one named cache inside a [`CacheStorage`]
///
/// Writing through a handle whose cache was deleted creates it again.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    storage: CacheStorage,
    name: String,
}

impl CacheHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put(&self, request: &Request, response: Response) {
        let mut inner = self.storage.lock();
        let key = inner.key(request);
        inner.open(&self.name).put(key, response);
    }

    /// Store a batch under a single lock
    pub fn put_all(&self, entries: Vec<(Request, Response)>) {
        let mut inner = self.storage.lock();
        let keyed: Vec<_> = entries
            .into_iter()
            .map(|(request, response)| (inner.key(&request), response))
            .collect();
        let cache = inner.open(&self.name);
        for (key, response) in keyed {
            cache.put(key, response);
        }
    }

    pub fn match_request(&self, request: &Request) -> Option<Response> {
        let mut inner = self.storage.lock();
        let key = inner.key(request);
        inner.find_mut(&self.name).and_then(|c| c.get(&key).cloned())
    }

    pub fn delete(&self, request: &Request) -> bool {
        let mut inner = self.storage.lock();
        let key = inner.key(request);
        inner.find_mut(&self.name).is_some_and(|c| c.delete(&key))
    }

    pub fn keys(&self) -> Vec<RequestKey> {
        self.storage
            .lock()
            .find(&self.name)
            .map(Cache::keys)
            .unwrap_or_default()
    }

    pub fn stats(&self) -> CacheStats {
        self.storage
            .lock()
            .find(&self.name)
            .map(Cache::stats)
            .unwrap_or(CacheStats {
                entry_count: 0,
                total_size: 0,
                max_entries: None,
            })
    }
}

/// Serializable form of a [`CacheStorage`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub caches: Vec<CacheSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub name: String,
    #[serde(default)]
    pub max_entries: Option<usize>,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub request: RequestKey,
    pub response: Response,
}
