//! Completed-request records.
//!
//! One [`RequestRecord`] is produced per call to the chat endpoint, after the
//! response status is known, and handed to a [`RequestLogSink`].

use gateway_core::{GuardrailDetection, ProviderName, RequestId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::info;

/// Target used for completed-request events
pub const REQUEST_LOG_TARGET: &str = "gateway::requests";

/// How the response cache participated in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CacheOutcome {
    /// Served from cache
    Hit {
        /// Stored latency minus serve time
        time_saved_ms: u64,
    },
    /// Looked up and not found (or expired)
    Miss,
    /// Request never reached the cache
    Bypass,
}

impl CacheOutcome {
    /// Hit outcome from a duration
    #[must_use]
    pub fn hit(time_saved: Duration) -> Self {
        Self::Hit {
            time_saved_ms: millis(time_saved),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Hit { .. } => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

/// One completed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    /// Correlation id
    pub request_id: RequestId,
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Response status
    pub status: u16,
    /// Wall-clock time until the response head was ready
    pub latency_ms: u64,
    /// Requested model, when the body was parsed
    pub model: Option<String>,
    /// Routed provider, when routing happened
    pub provider: Option<ProviderName>,
    /// Whether a streamed response was requested
    pub streaming: bool,
    /// Cache participation
    pub cache: CacheOutcome,
    /// Fingerprint of the rate-limit key
    pub client: String,
    /// Guardrail detections in occurrence order
    pub guardrail_detections: Vec<GuardrailDetection>,
    /// Error code for failed requests
    pub error_code: Option<&'static str>,
}

impl RequestRecord {
    /// Start a record for a request
    #[must_use]
    pub fn new(
        request_id: RequestId,
        method: impl Into<String>,
        path: impl Into<String>,
        client_key: &str,
    ) -> Self {
        Self {
            request_id,
            method: method.into(),
            path: path.into(),
            status: 200,
            latency_ms: 0,
            model: None,
            provider: None,
            streaming: false,
            cache: CacheOutcome::Bypass,
            client: fingerprint(client_key),
            guardrail_detections: Vec::new(),
            error_code: None,
        }
    }

    /// Set latency from a duration
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency_ms = millis(latency);
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Short, stable, non-reversible identifier for a client key.
///
/// Bearer tokens must never reach the logs; the sentinel `unknown` is kept as is.
#[must_use]
pub fn fingerprint(key: &str) -> String {
    if key == "unknown" {
        return key.to_string();
    }
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..6])
}

/// Receiver of completed-request records
pub trait RequestLogSink: Send + Sync {
    /// Accept one record
    fn record(&self, record: RequestRecord);
}

/// Sink that emits each record as one `info` event on [`REQUEST_LOG_TARGET`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLog;

impl RequestLogSink for TracingRequestLog {
    fn record(&self, record: RequestRecord) {
        let time_saved_ms = match record.cache {
            CacheOutcome::Hit { time_saved_ms } => Some(time_saved_ms),
            _ => None,
        };

        info!(
            target: REQUEST_LOG_TARGET,
            request_id = %record.request_id,
            method = %record.method,
            path = %record.path,
            status = record.status,
            latency_ms = record.latency_ms,
            model = record.model.as_deref(),
            provider = record.provider.map(|p| p.as_str()),
            streaming = record.streaming,
            cache = record.cache.label(),
            cache_time_saved_ms = time_saved_ms,
            client = %record.client,
            guardrail_detections = ?record.guardrail_detections,
            error_code = record.error_code,
            "Request completed"
        );
    }
}
