//! OpenAI-compatible adapter (passthrough).
//!
//! The request envelope goes upstream unchanged and the upstream response
//! comes back unchanged, streamed or not.

use crate::adapter::{ProviderAdapter, UpstreamBody, UpstreamResponse};
use crate::client::{build_client, forwardable_headers, upstream_error, Deadline};
use async_trait::async_trait;
use gateway_config::OpenAISettings;
use gateway_core::{ChatRequest, GatewayError, ProviderName};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Full URL of the chat completions endpoint
    pub endpoint: String,
    /// API key
    pub api_key: Option<SecretString>,
    /// Deadline for one call
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Configuration for `endpoint` with defaults
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build from settings, a resolved key and the global timeout
    #[must_use]
    pub fn from_settings(
        settings: &OpenAISettings,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key,
            timeout,
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible passthrough adapter
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("endpoint", &self.config.endpoint)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAIProvider {
    /// Create the adapter
    pub fn new(config: OpenAIConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            config,
            client: build_client()?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIProvider {
    fn name(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    #[instrument(skip_all, fields(provider = "openai", model = %request.model, stream = request.is_streaming()))]
    async fn execute(&self, request: &ChatRequest) -> Result<UpstreamResponse, GatewayError> {
        let deadline = Deadline::after(ProviderName::OpenAI, self.config.timeout);

        debug!(endpoint = %self.config.endpoint, "Sending request to OpenAI");

        let mut builder = self.client.post(&self.config.endpoint).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = deadline.send(builder).await?;
        let status = response.status();
        let headers = forwardable_headers(response.headers());

        if !status.is_success() {
            let body = deadline.read_body(response).await?;
            return Err(upstream_error(ProviderName::OpenAI, status.as_u16(), &body));
        }

        let body = if request.is_streaming() {
            UpstreamBody::Stream(deadline.stream_body(response))
        } else {
            UpstreamBody::Full(deadline.read_body(response).await?)
        };

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
