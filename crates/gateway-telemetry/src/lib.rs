//! # Gateway Telemetry
//!
//! Logging and request telemetry for the LLM relay gateway.
//!
//! This crate provides:
//! - Structured logging initialisation (pretty or JSON)
//! - The completed-request record and the sink that receives it

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod request_log;

pub use logging::{init_logging, LoggingError};
pub use request_log::{
    fingerprint, CacheOutcome, RequestLogSink, RequestRecord, TracingRequestLog, REQUEST_LOG_TARGET,
};
