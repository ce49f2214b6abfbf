//! # Gateway Security
//!
//! Content guardrails for the LLM relay gateway.
//!
//! ## Features
//!
//! - **Guardrail inspection**: optional PII scanning of request text and
//!   non-streaming response bodies, in `log` or `block` mode
//! - **Pluggable detection**: any backend implementing [`PiiDetector`]
//! - **Built-in detector**: [`RegexPiiDetector`] for common PII and secrets
//!
//! ## Example
//!
//! ```rust,no_run
//! use gateway_config::GuardrailConfig;
//! use gateway_security::{GuardrailInspector, RegexPiiDetector};
//! use std::sync::Arc;
//!
//! let inspector = GuardrailInspector::new(
//!     &GuardrailConfig::default(),
//!     Arc::new(RegexPiiDetector::new()),
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod guardrail;
pub mod pii;

pub use guardrail::{DetectorError, GuardrailInspector, PiiDetector};
pub use pii::RegexPiiDetector;
