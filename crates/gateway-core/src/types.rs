//! Shared identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream provider family a request can be dispatched to.
///
/// `OpenAI` is the primary, schema-compatible upstream (passthrough);
/// `Anthropic` is the secondary upstream that needs transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderName {
    /// OpenAI-compatible upstream
    #[serde(rename = "openai", alias = "primary")]
    OpenAI,
    /// Anthropic-compatible upstream
    #[serde(rename = "anthropic", alias = "secondary")]
    Anthropic,
}

impl ProviderName {
    /// Stable lowercase identifier used in logs and headers
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "primary" => Ok(Self::OpenAI),
            "anthropic" | "secondary" => Ok(Self::Anthropic),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Pipeline stage at which a guardrail inspection ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailStage {
    /// Inbound request body
    Request,
    /// Non-streaming upstream response body
    Response,
}

impl fmt::Display for GuardrailStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Entity labels reported by one guardrail inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailDetection {
    /// Stage that produced the detection
    pub stage: GuardrailStage,
    /// Entity-type labels, in the order the detector reported them
    pub labels: Vec<String>,
}

impl GuardrailDetection {
    /// Create a detection record
    #[must_use]
    pub fn new(stage: GuardrailStage, labels: Vec<String>) -> Self {
        Self { stage, labels }
    }
}

/// Request correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an identifier supplied by the caller
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
