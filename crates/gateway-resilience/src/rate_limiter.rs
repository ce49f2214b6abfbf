//! Per-key token bucket rate limiter.
//!
//! Each client key owns a bucket whose capacity and per-minute refill both
//! equal the configured requests-per-minute limit. Buckets are created lazily
//! and live for the lifetime of the limiter.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gateway_config::RateLimitConfig;
use tokio::time::Instant;
use tracing::debug;

const MILLIS_PER_MINUTE: u128 = 60_000;

#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    fn try_acquire(&mut self, now: Instant, capacity: u32, refill_per_minute: u32) -> bool {
        let elapsed_ms = now.saturating_duration_since(self.last_refill).as_millis();
        let refill = elapsed_ms * u128::from(refill_per_minute) / MILLIS_PER_MINUTE;

        if refill > 0 {
            let refill = u32::try_from(refill).unwrap_or(u32::MAX);
            self.tokens = self.tokens.saturating_add(refill).min(capacity);
            self.last_refill = now;
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// Token bucket admission control keyed by client identity.
///
/// The refill and consume steps for a key run under that key's shard lock,
/// so concurrent calls for the same key cannot lose updates.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    capacity: u32,
    refill_per_minute: u32,
}

impl RateLimiter {
    /// Create a limiter admitting `requests_per_minute` per key
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        let limit = requests_per_minute.max(1);
        Self {
            buckets: DashMap::new(),
            capacity: limit,
            refill_per_minute: limit,
        }
    }

    /// Create a limiter from configuration
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_minute)
    }

    /// Admit or reject one request for `key`
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = Instant::now();

        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return self.acquire(key, &mut bucket, now);
        }

        match self.buckets.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                // First sighting consumes a token immediately.
                slot.insert(TokenBucket {
                    tokens: self.capacity - 1,
                    last_refill: now,
                });
                true
            }
            Entry::Occupied(mut slot) => self.acquire(key, slot.get_mut(), now),
        }
    }

    fn acquire(&self, key: &str, bucket: &mut TokenBucket, now: Instant) -> bool {
        let allowed = bucket.try_acquire(now, self.capacity, self.refill_per_minute);
        if !allowed {
            debug!(key, "Rate limit bucket empty");
        }
        allowed
    }

    /// Bucket capacity
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of keys with a bucket
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}
