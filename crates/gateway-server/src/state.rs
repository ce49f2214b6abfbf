//! Application state shared by the handlers.

use crate::service::ChatService;
use gateway_config::GatewayConfig;
use gateway_providers::ProviderRegistry;
use gateway_resilience::{RateLimiter, ResponseCache};
use gateway_routing::ModelRouter;
use gateway_security::{GuardrailInspector, PiiDetector, RegexPiiDetector};
use gateway_telemetry::{RequestLogSink, TracingRequestLog};
use std::sync::Arc;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Request pipeline
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Wrap an assembled pipeline
    #[must_use]
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat: Arc::new(chat),
        }
    }

    /// Start building state from configuration
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    providers: Option<ProviderRegistry>,
    detector: Option<Arc<dyn PiiDetector>>,
    request_log: Option<Arc<dyn RequestLogSink>>,
}

impl AppStateBuilder {
    /// Gateway configuration
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Upstream adapters
    #[must_use]
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = Some(providers);
        self
    }

    /// PII detector used when guardrails are enabled (regex detector by default)
    #[must_use]
    pub fn detector(mut self, detector: Arc<dyn PiiDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Completed-request sink (tracing by default)
    #[must_use]
    pub fn request_log(mut self, sink: Arc<dyn RequestLogSink>) -> Self {
        self.request_log = Some(sink);
        self
    }

    /// Build the state
    #[must_use]
    pub fn build(self) -> AppState {
        let config = self.config.unwrap_or_default();

        let inspector = if config.guardrails.enabled {
            let detector: Arc<dyn PiiDetector> = match self.detector {
                Some(detector) => detector,
                None => Arc::new(RegexPiiDetector::new()),
            };
            GuardrailInspector::new(&config.guardrails, detector)
        } else {
            GuardrailInspector::disabled()
        };

        let request_log: Arc<dyn RequestLogSink> = match self.request_log {
            Some(sink) => sink,
            None => Arc::new(TracingRequestLog),
        };

        AppState::new(ChatService::new(
            RateLimiter::from_config(&config.rate_limit),
            ResponseCache::from_config(&config.cache),
            inspector,
            ModelRouter::from_config(&config.routing),
            self.providers.unwrap_or_default(),
            request_log,
        ))
    }
}
