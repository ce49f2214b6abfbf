//! API error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayError;
use serde::{Deserialize, Serialize};

/// Failure rendered as `{"error": {"message", "type", "code"}}`
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorEnvelope,
}

/// Top-level error document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details
    pub error: ErrorDetail,
}

/// Error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Error category
    #[serde(rename = "type")]
    pub error_type: String,
    /// Machine-readable code
    pub code: String,
}

impl ApiError {
    /// Status code of the response
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Rendered envelope
    #[must_use]
    pub fn envelope(&self) -> &ErrorEnvelope {
        &self.body
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self::from(&err)
    }
}

impl From<&GatewayError> for ApiError {
    fn from(err: &GatewayError) -> Self {
        Self {
            status: err.status_code(),
            body: ErrorEnvelope {
                error: ErrorDetail {
                    message: err.to_string(),
                    error_type: err.error_type().to_string(),
                    code: err.code().as_str().to_string(),
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{GuardrailStage, ProviderName};
    use std::time::Duration;

    #[test]
    fn test_error_table() {
        let cases = [
            (GatewayError::MissingModel, 400, "MISSING_MODEL"),
            (GatewayError::missing_messages("empty"), 400, "MISSING_MESSAGES"),
            (GatewayError::RateLimited, 429, "RATE_LIMIT_EXCEEDED"),
            (
                GatewayError::GuardrailBlocked {
                    stage: GuardrailStage::Request,
                    labels: vec!["EMAIL_ADDRESS".into()],
                },
                400,
                "PII_DETECTED",
            ),
            (
                GatewayError::GuardrailBlocked {
                    stage: GuardrailStage::Response,
                    labels: vec!["US_SSN".into()],
                },
                502,
                "PII_DETECTED",
            ),
            (
                GatewayError::Timeout {
                    provider: ProviderName::Anthropic,
                    after: Duration::from_secs(30),
                },
                504,
                "TIMEOUT",
            ),
            (
                GatewayError::upstream(ProviderName::OpenAI, 418, "teapot"),
                418,
                "PROVIDER_ERROR",
            ),
            (GatewayError::internal("boom"), 500, "INTERNAL_ERROR"),
        ];

        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status().as_u16(), status);
            assert_eq!(api.envelope().error.code, code);
        }
    }

    #[test]
    fn test_envelope_shape() {
        let api = ApiError::from(GatewayError::MissingModel);
        let json = serde_json::to_value(api.envelope()).expect("serializes");

        assert_eq!(json["error"]["code"], "MISSING_MODEL");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert!(json["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}
