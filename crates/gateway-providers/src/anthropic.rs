//! Anthropic Messages API adapter (transcoding).
//!
//! Requests are rewritten into the Messages schema and responses, streamed or
//! not, are rewritten back into the chat-completion schema.

use crate::adapter::{ProviderAdapter, UpstreamBody, UpstreamResponse};
use crate::client::{build_client, forwardable_headers, upstream_error, Deadline};
use crate::streaming::transcode_stream;
use async_trait::async_trait;
use bytes::Bytes;
use gateway_config::AnthropicSettings;
use gateway_core::{
    ChatCompletion, ChatRequest, FinishReason, GatewayError, MessageRole, ProviderName, Usage,
};
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// `max_tokens` sent when the caller gave none; the upstream requires one
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const MODEL_ALIASES: &[(&str, &str)] = &[
    ("claude-3-opus", "claude-3-opus-20240229"),
    ("claude-3-sonnet", "claude-3-sonnet-20240229"),
    ("claude-3-haiku", "claude-3-haiku-20240307"),
    ("claude-3-5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3-5-haiku", "claude-3-5-haiku-20241022"),
    ("claude-3-7-sonnet", "claude-3-7-sonnet-20250219"),
];

/// Dated upstream identifier for a model alias; unknown names pass through.
#[must_use]
pub fn resolve_model_alias(model: &str) -> &str {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == model)
        .map_or(model, |(_, dated)| *dated)
}

/// Anthropic provider configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Full URL of the messages endpoint
    pub endpoint: String,
    /// API key
    pub api_key: Option<SecretString>,
    /// `anthropic-version` header value
    pub api_version: String,
    /// Deadline for one call
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Configuration for `endpoint` with defaults
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            api_version: "2023-06-01".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build from settings, a resolved key and the global timeout
    #[must_use]
    pub fn from_settings(
        settings: &AnthropicSettings,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key,
            api_version: settings.api_version.clone(),
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

/// Messages API request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicRequest {
    /// Dated model identifier
    pub model: String,
    /// User and assistant turns, in order
    pub messages: Vec<AnthropicMessage>,
    /// Extracted system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Token limit
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Streaming flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Messages API turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnthropicMessage {
    /// `user` or `assistant`
    pub role: &'static str,
    /// Text content
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Rewrite a chat-completion request into the Messages schema.
///
/// System messages are lifted into `system` (joined by newlines when there
/// are several); the remaining turns keep their order. Only system, user and
/// assistant text turns can be expressed; tool turns and messages without
/// text are rejected.
pub fn transform_request(request: &ChatRequest) -> Result<AnthropicRequest, GatewayError> {
    let mut system = Vec::new();
    let mut messages = Vec::with_capacity(request.messages.len());

    for (index, message) in request.messages.iter().enumerate() {
        let Some(text) = message.text() else {
            return Err(GatewayError::invalid_request(format!(
                "messages[{index}] has no text content, which Anthropic models do not accept"
            )));
        };
        match message.role {
            MessageRole::System => system.push(text),
            MessageRole::User => messages.push(AnthropicMessage {
                role: "user",
                content: text.to_string(),
            }),
            MessageRole::Assistant => messages.push(AnthropicMessage {
                role: "assistant",
                content: text.to_string(),
            }),
            MessageRole::Tool => {
                return Err(GatewayError::invalid_request(format!(
                    "messages[{index}] has role 'tool', which Anthropic models do not accept"
                )))
            }
        }
    }

    Ok(AnthropicRequest {
        model: resolve_model_alias(&request.model).to_string(),
        messages,
        system: (!system.is_empty()).then(|| system.join("\n")),
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        top_p: request.top_p,
        stream: request.stream,
    })
}

/// Map an upstream stop reason to the exposed vocabulary
#[must_use]
pub fn map_stop_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("max_tokens") => FinishReason::Length,
        // end_turn, stop_sequence, anything else or absent
        _ => FinishReason::Stop,
    }
}

/// Rewrite a Messages API response body into a chat completion
pub fn transform_response(body: &[u8], requested_model: &str) -> Result<ChatCompletion, GatewayError> {
    let response: AnthropicResponse = serde_json::from_slice(body)
        .map_err(|e| GatewayError::internal(format!("Failed to parse Anthropic response: {e}")))?;

    let content: String = response
        .content
        .iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    let id = response
        .id
        .unwrap_or_else(|| format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()));
    let model = response
        .model
        .unwrap_or_else(|| requested_model.to_string());

    Ok(ChatCompletion::single(
        id,
        model,
        content,
        map_stop_reason(response.stop_reason.as_deref()),
        Usage::new(response.usage.input_tokens, response.usage.output_tokens),
    ))
}

/// Anthropic-compatible transcoding adapter
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("endpoint", &self.config.endpoint)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Create the adapter
    pub fn new(config: AnthropicConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            config,
            client: build_client()?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Anthropic
    }

    #[instrument(skip_all, fields(provider = "anthropic", model = %request.model, stream = request.is_streaming()))]
    async fn execute(&self, request: &ChatRequest) -> Result<UpstreamResponse, GatewayError> {
        let deadline = Deadline::after(ProviderName::Anthropic, self.config.timeout);
        let upstream_request = transform_request(request)?;

        debug!(upstream_model = %upstream_request.model, "Sending request to Anthropic");

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("anthropic-version", &self.config.api_version)
            .json(&upstream_request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        let response = deadline.send(builder).await?;
        let status = response.status();
        let mut headers = forwardable_headers(response.headers());

        if !status.is_success() {
            let body = deadline.read_body(response).await?;
            return Err(upstream_error(ProviderName::Anthropic, status.as_u16(), &body));
        }

        if request.is_streaming() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
            let stream = transcode_stream(deadline.stream_body(response), request.model.clone());
            return Ok(UpstreamResponse {
                status,
                headers,
                body: UpstreamBody::Stream(stream),
            });
        }

        let body = deadline.read_body(response).await?;
        let completion = transform_response(&body, &request.model)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(UpstreamResponse {
            status,
            headers,
            body: UpstreamBody::Full(Bytes::from(serde_json::to_vec(&completion)?)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use gateway_core::{ChatMessage, DONE_FRAME};
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, timeout: Duration) -> AnthropicProvider {
        AnthropicProvider::new(
            AnthropicConfig::new(format!("{}/v1/messages", server.uri()))
                .with_api_key("sk-ant-test")
                .with_timeout(timeout),
        )
        .expect("client builds")
    }

    #[test]
    fn test_system_prompt_extraction() {
        let request = ChatRequest::new(
            "claude-3-5-sonnet",
            vec![ChatMessage::system("Be terse"), ChatMessage::user("Hi")],
        );
        let upstream = transform_request(&request).expect("transcodable");

        assert_eq!(upstream.system.as_deref(), Some("Be terse"));
        assert_eq!(
            upstream.messages,
            vec![AnthropicMessage {
                role: "user",
                content: "Hi".to_string()
            }]
        );
        assert_eq!(upstream.model, "claude-3-5-sonnet-20241022");
        assert_eq!(upstream.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_multiple_system_messages_are_joined() {
        let request = ChatRequest::new(
            "claude-3-haiku",
            vec![
                ChatMessage::system("Rule one"),
                ChatMessage::system("Rule two"),
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Hello"),
                ChatMessage::user("Bye"),
            ],
        );
        let upstream = transform_request(&request).expect("transcodable");

        assert_eq!(upstream.system.as_deref(), Some("Rule one\nRule two"));
        let roles: Vec<_> = upstream.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
    }

    #[test]
    fn test_optional_fields_only_when_present() {
        let request = ChatRequest::new("my-custom-model", vec![ChatMessage::user("Hi")]);
        let value = serde_json::to_value(transform_request(&request).expect("transcodable")).expect("serialize");

        assert_eq!(value["model"], "my-custom-model");
        assert!(value.get("system").is_none());
        assert!(value.get("temperature").is_none());
        assert!(value.get("top_p").is_none());
        assert!(value.get("stream").is_none());

        let request = ChatRequest::new("claude-3-opus", vec![ChatMessage::user("Hi")])
            .with_temperature(0.2)
            .with_top_p(0.9)
            .with_max_tokens(64)
            .with_stream(true);
        let value = serde_json::to_value(transform_request(&request).expect("transcodable")).expect("serialize");

        assert_eq!(value["temperature"], 0.2);
        assert_eq!(value["top_p"], 0.9);
        assert_eq!(value["max_tokens"], 64);
        assert_eq!(value["stream"], true);

        let request =
            ChatRequest::new("claude-3-opus", vec![ChatMessage::user("Hi")]).with_stream(false);
        let value = serde_json::to_value(transform_request(&request).expect("transcodable"))
            .expect("serialize");
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn test_tool_turns_are_rejected() {
        let request: ChatRequest = serde_json::from_value(json!({
            "model": "claude-3-5-sonnet",
            "messages": [
                {"role": "user", "content": "Weather?"},
                {"role": "assistant", "content": null, "tool_calls": [{"id": "call_1"}]},
                {"role": "tool", "tool_call_id": "call_1", "content": "18C"}
            ]
        }))
        .expect("request");

        let err = transform_request(&request).expect_err("null content");
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(err.to_string().contains("messages[1]"));

        let request = ChatRequest {
            messages: vec![request.messages[0].clone(), request.messages[2].clone()],
            ..request
        };
        let err = transform_request(&request).expect_err("tool role");
        assert!(err.to_string().contains("messages[1] has role 'tool'"));
    }

    #[test]
    fn test_message_extras_are_not_forwarded() {
        let request: ChatRequest = serde_json::from_value(json!({
            "model": "claude-3-haiku",
            "messages": [{"role": "user", "content": "Hi", "name": "alice"}]
        }))
        .expect("request");
        let value = serde_json::to_value(transform_request(&request).expect("transcodable"))
            .expect("serialize");

        assert_eq!(value["messages"], json!([{"role": "user", "content": "Hi"}]));
    }

    #[test]
    fn test_response_transform() {
        let body = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": " world"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        });
        let completion =
            transform_response(body.to_string().as_bytes(), "claude-3-5-sonnet").expect("transform");

        assert_eq!(completion.id, "msg_01");
        assert_eq!(completion.model, "claude-3-5-sonnet-20241022");
        assert_eq!(completion.choices[0].message.content, "Hello world");
        assert_eq!(completion.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(completion.usage, Usage::new(12, 4));
        assert_eq!(completion.usage.total_tokens, 16);
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason(Some("end_turn")), FinishReason::Stop);
        assert_eq!(map_stop_reason(Some("stop_sequence")), FinishReason::Stop);
        assert_eq!(map_stop_reason(Some("max_tokens")), FinishReason::Length);
        assert_eq!(map_stop_reason(Some("tool_use")), FinishReason::Stop);
        assert_eq!(map_stop_reason(None), FinishReason::Stop);
    }

    #[test]
    fn test_unparsable_response_is_internal_error() {
        let err = transform_response(b"not json", "m").expect_err("invalid body");
        assert_eq!(err.status_code().as_u16(), 500);
    }

    #[tokio::test]
    async fn test_execute_non_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-3-haiku-20240307",
                "system": "Be terse",
                "messages": [{"role": "user", "content": "Hi"}],
                "max_tokens": 1024
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "model": "claude-3-haiku-20240307",
                "content": [{"type": "text", "text": "Hello"}],
                "stop_reason": "max_tokens",
                "usage": {"input_tokens": 3, "output_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(
            "claude-3-haiku",
            vec![ChatMessage::system("Be terse"), ChatMessage::user("Hi")],
        );
        let response = provider(&server, Duration::from_secs(5))
            .execute(&request)
            .await
            .expect("success");

        assert_eq!(response.status.as_u16(), 200);
        let UpstreamBody::Full(body) = response.body else {
            panic!("expected full body");
        };
        let value: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["object"], "chat.completion");
        assert_eq!(value["choices"][0]["message"]["content"], "Hello");
        assert_eq!(value["choices"][0]["finish_reason"], "length");
        assert_eq!(value["usage"]["total_tokens"], 4);
    }

    #[tokio::test]
    async fn test_execute_streaming() {
        let server = MockServer::start().await;
        let sse = concat!(
            "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let request =
            ChatRequest::new("claude-3-5-sonnet", vec![ChatMessage::user("Hi")]).with_stream(true);
        let response = provider(&server, Duration::from_secs(5))
            .execute(&request)
            .await
            .expect("success");

        assert_eq!(
            response.headers.get(CONTENT_TYPE).expect("content type"),
            "text/event-stream"
        );
        let UpstreamBody::Stream(stream) = response.body else {
            panic!("expected stream");
        };
        let frames: Vec<Bytes> = stream
            .map(|frame| frame.expect("frame"))
            .collect()
            .await;

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3], Bytes::from_static(DONE_FRAME));
        let text = String::from_utf8(frames.concat()).expect("utf8");
        assert!(text.contains("\"content\":\"Hi\""));
        assert!(text.contains("\"content\":\" there\""));
        assert!(text.contains("\"finish_reason\":\"stop\""));
    }

    #[tokio::test]
    async fn test_non_2xx_is_mirrored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "max_tokens: too large"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server, Duration::from_secs(5))
            .execute(&ChatRequest::new("claude-3-opus", vec![ChatMessage::user("Hi")]))
            .await
            .expect_err("upstream error");

        assert_eq!(err.status_code().as_u16(), 400);
        assert_eq!(err.code().as_str(), "PROVIDER_ERROR");
        assert_eq!(err.to_string(), "max_tokens: too large");
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = provider(&server, Duration::from_millis(50))
            .execute(&ChatRequest::new("claude-3-opus", vec![ChatMessage::user("Hi")]))
            .await
            .expect_err("timed out");

        assert!(matches!(err, GatewayError::Timeout { provider: ProviderName::Anthropic, .. }));
        assert_eq!(err.status_code().as_u16(), 504);
    }
}
