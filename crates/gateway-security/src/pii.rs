//! Built-in regex PII detector.
//!
//! Recognises:
//! - Email addresses
//! - Phone numbers (North American formats)
//! - US Social Security Numbers
//! - Credit card numbers
//! - IPv4 addresses
//! - API keys and provider secret keys
//! - AWS access keys
//! - JWT tokens

use crate::guardrail::{DetectorError, PiiDetector};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Email address label
pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
/// Phone number label
pub const PHONE_NUMBER: &str = "PHONE_NUMBER";
/// US SSN label
pub const US_SSN: &str = "US_SSN";
/// Credit card label
pub const CREDIT_CARD: &str = "CREDIT_CARD";
/// IP address label
pub const IP_ADDRESS: &str = "IP_ADDRESS";
/// API key label
pub const API_KEY: &str = "API_KEY";
/// AWS key label
pub const AWS_KEY: &str = "AWS_KEY";
/// JWT label
pub const JWT: &str = "JWT";

const PATTERNS: &[(&str, &str)] = &[
    (EMAIL_ADDRESS, r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
    (
        PHONE_NUMBER,
        r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|\b[0-9]{3})[-.\s][0-9]{3}[-.\s][0-9]{4}\b",
    ),
    (US_SSN, r"\b[0-9]{3}-[0-9]{2}-[0-9]{4}\b"),
    (
        CREDIT_CARD,
        r"\b(?:4[0-9]{3}|5[1-5][0-9]{2}|6(?:011|5[0-9]{2})|3[47][0-9]{2}|3(?:0[0-5]|[68][0-9])[0-9])[-\s]?[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{1,4}\b",
    ),
    (
        IP_ADDRESS,
        r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
    ),
    (
        API_KEY,
        r#"(?i)\bsk-(?:ant-)?[A-Za-z0-9_-]{20,}\b|(?:api[_-]?key|apikey|api_secret|secret_key|access_token)[=:\s]+['"]?[A-Za-z0-9_-]{20,}"#,
    ),
    (AWS_KEY, r"\b(?:AKIA|ABIA|ACCA|ASIA)[A-Z0-9]{16}\b"),
    (JWT, r"\beyJ[A-Za-z0-9_-]*\.eyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]*"),
];

static COMPILED: Lazy<Result<Vec<(&'static str, Regex)>, regex::Error>> = Lazy::new(|| {
    PATTERNS
        .iter()
        .map(|(label, pattern)| Regex::new(pattern).map(|re| (*label, re)))
        .collect()
});

/// Detector backed by the built-in pattern table.
///
/// Labels are reported once each, in pattern-table order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexPiiDetector;

impl RegexPiiDetector {
    /// Create the detector
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Synchronous scan
    pub fn scan(&self, text: &str) -> Result<Vec<String>, DetectorError> {
        let patterns = COMPILED
            .as_ref()
            .map_err(|e| DetectorError::Backend(format!("invalid built-in pattern: {e}")))?;

        if text.is_empty() {
            return Ok(Vec::new());
        }

        Ok(patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(label, _)| (*label).to_string())
            .collect())
    }
}

#[async_trait]
impl PiiDetector for RegexPiiDetector {
    async fn detect(&self, text: &str) -> Result<Vec<String>, DetectorError> {
        self.scan(text)
    }
}
