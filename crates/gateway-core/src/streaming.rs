//! Streaming chunk types and SSE framing.

use crate::response::FinishReason;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Terminal frame closing every exposed event stream
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// One incremental chunk in the exposed streaming format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Chunk ID
    pub id: String,

    /// Object type, always "chat.completion.chunk"
    pub object: String,

    /// Creation timestamp (Unix seconds)
    pub created: i64,

    /// Model name
    pub model: String,

    /// Chunk choices
    pub choices: Vec<ChunkChoice>,
}

impl ChatChunk {
    /// Chunk carrying an incremental text delta with no finish reason
    #[must_use]
    pub fn delta(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::fresh(
            model.into(),
            ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    content: Some(text.into()),
                },
                finish_reason: None,
            },
        )
    }

    /// Chunk with an empty delta carrying the finish reason
    #[must_use]
    pub fn finish(model: impl Into<String>, reason: FinishReason) -> Self {
        Self::fresh(
            model.into(),
            ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: Some(reason),
            },
        )
    }

    // Ids and timestamps are generated per chunk.
    fn fresh(model: String, choice: ChunkChoice) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp(),
            model,
            choices: vec![choice],
        }
    }

    /// Encode as a `data: <json>\n\n` frame
    pub fn to_sse_frame(&self) -> Result<Bytes, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        let mut frame = Vec::with_capacity(json.len() + 8);
        frame.extend_from_slice(b"data: ");
        frame.extend_from_slice(&json);
        frame.extend_from_slice(b"\n\n");
        Ok(Bytes::from(frame))
    }
}

/// Streaming choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,

    /// Incremental content
    pub delta: ChunkDelta,

    /// Finish reason, present only on the final chunk
    pub finish_reason: Option<FinishReason>,
}

/// Incremental message content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Text delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
