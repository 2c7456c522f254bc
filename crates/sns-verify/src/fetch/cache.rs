//! In-memory certificate cache.
//!
//! SNS rotates signing certificates rarely, and every notification in a busy
//! topic points at the same URL. [`CachingFetcher`] keeps successful
//! responses per URL for a TTL. Failures are never cached.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CertificateFetcher;
use crate::error::FetchError;

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched certificate is reused, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached URLs.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl_secs() -> u64 {
    60 * 60
}

fn default_max_entries() -> usize {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

#[derive(Debug)]
struct CachedCert {
    bytes: Vec<u8>,
    fetched_at: Instant,
    /// Insertion order; Instant can tie on coarse clocks.
    seq: u64,
}

/// Caching decorator around another fetcher.
#[derive(Debug)]
pub struct CachingFetcher<F> {
    inner: F,
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CachedCert>>,
}

impl<F: CertificateFetcher> CachingFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: F, config: CacheConfig) -> Self {
        Self {
            inner,
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached certificate.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().ok()?;
        let cached = entries.get(url)?;
        if cached.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(cached.bytes.clone())
    }

    fn store(&self, url: &str, bytes: &[u8]) {
        // A poisoned lock only costs us the cache, never the fetch.
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        let ttl = self.ttl;
        entries.retain(|_, cached| cached.fetched_at.elapsed() < ttl);

        if entries.len() >= self.max_entries && !entries.contains_key(url) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.seq)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        let seq = entries.values().map(|c| c.seq + 1).max().unwrap_or(0);
        entries.insert(
            url.to_string(),
            CachedCert {
                bytes: bytes.to_vec(),
                fetched_at: Instant::now(),
                seq,
            },
        );
    }
}

impl<F: CertificateFetcher> CertificateFetcher for CachingFetcher<F> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(bytes) = self.lookup(url) {
            debug!(url, "certificate cache hit");
            return Ok(bytes);
        }

        debug!(url, "certificate cache miss");
        let bytes = self.inner.fetch(url)?;
        if !bytes.is_empty() {
            self.store(url, &bytes);
        }
        Ok(bytes)
    }
}
