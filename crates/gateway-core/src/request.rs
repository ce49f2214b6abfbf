//! Request types for the gateway.
//!
//! This module defines the exposed chat-completion request envelope. Fields the
//! gateway understands are typed; everything else the caller sent is kept in
//! [`PassthroughFields`] so schema-compatible upstreams receive it unchanged.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Exposed chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Target model (e.g., "gpt-4o", "claude-3-5-sonnet")
    pub model: String,

    /// Conversation, in order
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Nucleus sampling parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Enable streaming response; absent unless the caller sent it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Fields the gateway does not interpret
    #[serde(flatten)]
    pub extra: PassthroughFields,
}

impl ChatRequest {
    /// Create a request with the required fields
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: None,
            extra: PassthroughFields::default(),
        }
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top_p
    #[must_use]
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set max_tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable or disable streaming
    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Whether the caller asked for a streamed response
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    /// Decode and validate a raw request body.
    ///
    /// `model` is checked before `messages`, and both before any other field,
    /// so callers get the most specific error code available.
    pub fn from_slice(body: &[u8]) -> GatewayResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| GatewayError::invalid_request(format!("body is not valid JSON: {e}")))?;

        let Value::Object(fields) = &value else {
            return Err(GatewayError::invalid_request("body must be a JSON object"));
        };

        match fields.get("model") {
            Some(Value::String(model)) if !model.trim().is_empty() => {}
            _ => return Err(GatewayError::MissingModel),
        }

        let items = match fields.get("messages") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            Some(Value::Array(_)) => {
                return Err(GatewayError::missing_messages("'messages' must not be empty"))
            }
            _ => {
                return Err(GatewayError::missing_messages(
                    "'messages' is required and must be an array",
                ))
            }
        };

        for (index, item) in items.iter().enumerate() {
            let message = ChatMessage::deserialize(item).map_err(|e| {
                GatewayError::missing_messages(format!("messages[{index}] is invalid: {e}"))
            })?;
            // Only tool-calling turns may omit text.
            if message.text().is_none() && message.extra.get("tool_calls").is_none() {
                return Err(GatewayError::missing_messages(format!(
                    "messages[{index}] has no text content"
                )));
            }
        }

        serde_json::from_value(value).map_err(|e| GatewayError::invalid_request(e.to_string()))
    }

    /// All message text joined by newlines, used for content inspection
    #[must_use]
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .filter_map(ChatMessage::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// String values nested anywhere in the uninterpreted fields of the
    /// request and its messages, joined by newlines
    #[must_use]
    pub fn passthrough_text(&self) -> String {
        let mut strings = Vec::new();
        self.extra.collect_strings(&mut strings);
        for message in &self.messages {
            message.extra.collect_strings(&mut strings);
        }
        strings.join("\n")
    }
}

/// Chat message with role and content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,

    /// Text content. `Some(None)` is an explicit `null`, as sent on
    /// tool-calling turns; `None` means the field was absent.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,

    /// Message fields the gateway does not interpret (`name`, `tool_calls`,
    /// `tool_call_id`, ...)
    #[serde(flatten)]
    pub extra: PassthroughFields,
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ChatMessage {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(Some(content.into())),
            extra: PassthroughFields::default(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(Some(content.into())),
            extra: PassthroughFields::default(),
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(Some(content.into())),
            extra: PassthroughFields::default(),
        }
    }

    /// Text content, if the message carries any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Option::as_deref)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool result message
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Unrecognised request fields, forwarded untouched to passthrough upstreams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassthroughFields(Map<String, Value>);

impl PassthroughFields {
    /// Look up a field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no extra fields were sent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn collect_strings<'a>(&'a self, out: &mut Vec<&'a str>) {
        fn walk<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
            match value {
                Value::String(s) => out.push(s),
                Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
                Value::Object(fields) => fields.values().for_each(|v| walk(v, out)),
                _ => {}
            }
        }
        self.0.values().for_each(|v| walk(v, out));
    }
}
