//! Guardrail inspection around request and response bodies.

use async_trait::async_trait;
use gateway_config::{GuardrailConfig, GuardrailMode};
use gateway_core::{ChatRequest, GatewayError, GuardrailDetection, GuardrailStage};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Failure inside a detector backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectorError {
    /// Backend could not be reached
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    /// Backend failed while analysing text
    #[error("Detector failed: {0}")]
    Backend(String),
}

/// PII detection capability.
///
/// Returns the entity-type labels found in `text`, empty when nothing matched.
#[async_trait]
pub trait PiiDetector: Send + Sync {
    /// Detect entities in `text`
    async fn detect(&self, text: &str) -> Result<Vec<String>, DetectorError>;
}

/// Optional content-inspection stage.
///
/// When disabled every inspection is a no-op. Detector failures fail open:
/// they are logged and treated as "nothing found".
#[derive(Clone)]
pub struct GuardrailInspector {
    detector: Option<Arc<dyn PiiDetector>>,
    mode: GuardrailMode,
}

impl std::fmt::Debug for GuardrailInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardrailInspector")
            .field("enabled", &self.is_enabled())
            .field("mode", &self.mode)
            .finish()
    }
}

impl GuardrailInspector {
    /// Create an inspector; `detector` is only consulted when enabled
    pub fn new(config: &GuardrailConfig, detector: Arc<dyn PiiDetector>) -> Self {
        Self {
            detector: config.enabled.then_some(detector),
            mode: config.mode,
        }
    }

    /// Inspector that never inspects
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            detector: None,
            mode: GuardrailMode::Log,
        }
    }

    /// Whether inspection runs
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.detector.is_some()
    }

    /// Operating mode
    #[must_use]
    pub fn mode(&self) -> GuardrailMode {
        self.mode
    }

    /// Inspect an inbound request: message text plus every string carried in
    /// fields the gateway forwards without interpreting
    pub async fn inspect_request(
        &self,
        request: &ChatRequest,
        detections: &mut Vec<GuardrailDetection>,
    ) -> Result<(), GatewayError> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.inspect(GuardrailStage::Request, &request_text(request), detections)
            .await
    }

    /// Inspect a non-streaming response body
    pub async fn inspect_response(
        &self,
        body: &[u8],
        detections: &mut Vec<GuardrailDetection>,
    ) -> Result<(), GatewayError> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.inspect(GuardrailStage::Response, &response_text(body), detections)
            .await
    }

    async fn inspect(
        &self,
        stage: GuardrailStage,
        text: &str,
        detections: &mut Vec<GuardrailDetection>,
    ) -> Result<(), GatewayError> {
        let Some(detector) = &self.detector else {
            return Ok(());
        };

        let labels = match detector.detect(text).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(stage = %stage, error = %e, "PII detector failed, continuing without inspection");
                Vec::new()
            }
        };

        if labels.is_empty() {
            return Ok(());
        }

        info!(stage = %stage, labels = ?labels, mode = %self.mode, "Guardrail detection");
        detections.push(GuardrailDetection::new(stage, labels.clone()));

        match self.mode {
            GuardrailMode::Log => Ok(()),
            GuardrailMode::Block => Err(GatewayError::GuardrailBlocked { stage, labels }),
        }
    }
}

fn request_text(request: &ChatRequest) -> String {
    let mut text = request.prompt_text();
    let extras = request.passthrough_text();
    if !extras.is_empty() {
        text.push('\n');
        text.push_str(&extras);
    }
    text
}

/// Assistant text of a completion body; the raw body when it is not one.
fn response_text(body: &[u8]) -> String {
    let contents = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        let choices = value.get("choices")?.as_array()?;
        Some(
            choices
                .iter()
                .filter_map(|c| c.pointer("/message/content").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    });

    contents.unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
