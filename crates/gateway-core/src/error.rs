//! Error types for the gateway pipeline.
//!
//! Every externally visible failure is one variant of [`GatewayError`]. The
//! variant alone decides the HTTP status and the machine-readable
//! [`ErrorCode`]; nothing inspects error message text.

use crate::types::{GuardrailStage, ProviderName};
use http::StatusCode;
use std::time::Duration;

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Machine-readable error code rendered in the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Request has no usable `model`
    MissingModel,
    /// Request has no usable `messages`
    MissingMessages,
    /// Body is not valid JSON or a field has the wrong type
    InvalidRequest,
    /// Client exhausted its token bucket
    RateLimitExceeded,
    /// Guardrail blocked the request or the response
    PiiDetected,
    /// Upstream call exceeded the configured timeout
    Timeout,
    /// Upstream returned non-2xx
    ProviderError,
    /// Any other fault
    InternalError,
}

impl ErrorCode {
    /// Wire representation of the code
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingModel => "MISSING_MODEL",
            Self::MissingMessages => "MISSING_MESSAGES",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::PiiDetected => "PII_DETECTED",
            Self::Timeout => "TIMEOUT",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway pipeline error
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// `model` is absent, not a string, or empty
    #[error("'model' is required")]
    MissingModel,

    /// `messages` is absent, empty, or malformed
    #[error("{0}")]
    MissingMessages(String),

    /// Body could not be decoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded for a client key
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// Guardrail detected sensitive content in block mode
    #[error("{}", guardrail_message(.stage, .labels))]
    GuardrailBlocked {
        /// Stage that triggered the block
        stage: GuardrailStage,
        /// Entity labels that were detected
        labels: Vec<String>,
    },

    /// Upstream call exceeded its deadline and was cancelled
    #[error("Request to {provider} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Provider that timed out
        provider: ProviderName,
        /// Configured deadline
        after: Duration,
    },

    /// Upstream could not be reached or the connection failed
    #[error("Failed to reach {provider}: {message}")]
    Transport {
        /// Provider that failed
        provider: ProviderName,
        /// Transport failure description
        message: String,
    },

    /// Upstream answered with a non-2xx status
    #[error("{message}")]
    Upstream {
        /// Provider that answered
        provider: ProviderName,
        /// Upstream status code
        status: u16,
        /// Upstream error message
        message: String,
    },

    /// Any other internal fault
    #[error("Internal error: {0}")]
    Internal(String),
}

fn guardrail_message(stage: &GuardrailStage, labels: &[String]) -> String {
    match stage {
        GuardrailStage::Request => format!(
            "Request blocked: sensitive content detected ({})",
            labels.join(", ")
        ),
        GuardrailStage::Response => format!(
            "Response blocked: sensitive content detected ({})",
            labels.join(", ")
        ),
    }
}

impl GatewayError {
    /// Create a missing/invalid messages error
    pub fn missing_messages(message: impl Into<String>) -> Self {
        Self::MissingMessages(message.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a transport error
    pub fn transport(provider: ProviderName, message: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            message: message.into(),
        }
    }

    /// Create an upstream status error
    pub fn upstream(provider: ProviderName, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingModel | Self::MissingMessages(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::GuardrailBlocked { stage, .. } => match stage {
                GuardrailStage::Request => StatusCode::BAD_REQUEST,
                GuardrailStage::Response => StatusCode::BAD_GATEWAY,
            },
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingModel => ErrorCode::MissingModel,
            Self::MissingMessages(_) => ErrorCode::MissingMessages,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::RateLimited => ErrorCode::RateLimitExceeded,
            Self::GuardrailBlocked { .. } => ErrorCode::PiiDetected,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Upstream { .. } => ErrorCode::ProviderError,
            Self::Transport { .. } | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Error category rendered as `error.type`
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MissingModel | Self::MissingMessages(_) | Self::InvalidRequest(_) => {
                "invalid_request_error"
            }
            Self::RateLimited => "rate_limit_error",
            Self::GuardrailBlocked { .. } => "guardrail_error",
            Self::Timeout { .. } => "timeout_error",
            Self::Upstream { .. } => "provider_error",
            Self::Transport { .. } | Self::Internal(_) => "internal_error",
        }
    }

    /// Provider involved in the failure, if any
    #[must_use]
    pub fn provider(&self) -> Option<ProviderName> {
        match self {
            Self::Timeout { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Upstream { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}
