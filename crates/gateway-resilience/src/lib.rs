//! # Gateway Resilience
//!
//! Shared, process-wide request state for the LLM relay gateway:
//! - Per-client token bucket admission control
//! - TTL response cache keyed by request path and exact body bytes
//!
//! Both stores are owned by a service instance and injected where needed, so
//! isolated instances can run side by side.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod rate_limiter;

pub use cache::{CacheHit, CachedResponse, ResponseCache};
pub use rate_limiter::RateLimiter;
