//! TTL response cache.
//!
//! Entries are keyed by the request path followed by the exact request body
//! bytes. There is no normalization: equivalent bodies that differ in
//! whitespace or key order are distinct entries.
//!
//! Entries are never swept. An expired entry stays resident until a newer
//! response with the same key overwrites it.

use bytes::Bytes;
use dashmap::DashMap;
use gateway_config::CacheConfig;
use gateway_core::ProviderName;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A response eligible for replay
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Upstream status
    pub status: StatusCode,
    /// Upstream headers, hop-by-hop headers already removed
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
    /// Time the original call took
    pub latency: Duration,
    /// Resolved model
    pub model: String,
    /// Provider that served the original call
    pub provider: ProviderName,
}

impl CachedResponse {
    /// Whether the response may be stored: 2xx and not an event stream
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.status.is_success() && !is_event_stream(&self.headers)
    }
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("text/event-stream"))
}

/// Result of a fresh lookup
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// Stored response, replayed byte-for-byte
    pub response: CachedResponse,
    /// Stored latency minus the time spent serving from cache, floored at zero
    pub time_saved: Duration,
}

#[derive(Debug)]
struct CacheEntry {
    response: CachedResponse,
    expires_at: Instant,
}

// About 30 years: stands in for expiries too far out to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn expiry(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE)
}

/// In-memory TTL cache of upstream responses.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<Vec<u8>, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Create a cache from configuration
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl)
    }

    fn key(path: &str, body: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(path.len() + body.len());
        key.extend_from_slice(path.as_bytes());
        key.extend_from_slice(body);
        key
    }

    /// Fresh entry for the request, if any
    pub fn lookup(&self, path: &str, body: &[u8]) -> Option<CacheHit> {
        let started = Instant::now();
        let key = Self::key(path, body);

        let entry = self.entries.get(&key)?;
        if entry.expires_at <= started {
            debug!(path, "Cache entry expired");
            return None;
        }

        let response = entry.response.clone();
        drop(entry);

        let time_saved = response.latency.saturating_sub(started.elapsed());
        Some(CacheHit {
            response,
            time_saved,
        })
    }

    /// Store a response if it is cacheable. Returns whether it was stored.
    pub fn store(&self, path: &str, body: &[u8], response: CachedResponse) -> bool {
        if !response.is_cacheable() {
            return false;
        }

        let entry = CacheEntry {
            response,
            expires_at: expiry(self.ttl),
        };
        self.entries.insert(Self::key(path, body), entry);
        true
    }

    /// Entry lifetime
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of resident entries, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
