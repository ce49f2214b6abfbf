//! Response types for the exposed chat-completion schema.

use serde::{Deserialize, Serialize};

/// Non-streaming chat completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Completion ID
    pub id: String,

    /// Object type, always "chat.completion"
    pub object: String,

    /// Creation timestamp (Unix seconds)
    pub created: i64,

    /// Model that produced the completion
    pub model: String,

    /// Generated choices
    pub choices: Vec<Choice>,

    /// Token usage
    pub usage: Usage,
}

impl ChatCompletion {
    /// Build a single-choice assistant completion
    #[must_use]
    pub fn single(
        id: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
        finish_reason: FinishReason,
        usage: Usage,
    ) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage::assistant(content),
                finish_reason: Some(finish_reason),
            }],
            usage,
        }
    }
}

/// A generated choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Choice index
    pub index: u32,

    /// Generated message
    pub message: ResponseMessage,

    /// Why generation stopped
    pub finish_reason: Option<FinishReason>,
}

/// Message carried by a completion choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Author role
    pub role: String,

    /// Text content
    #[serde(default)]
    pub content: String,
}

impl ResponseMessage {
    /// Assistant message with the given text
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Exposed finish-reason vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence
    Stop,
    /// Token limit reached
    Length,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u32,

    /// Completion tokens
    pub completion_tokens: u32,

    /// Total tokens
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt and completion counts
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}
