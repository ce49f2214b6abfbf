//! # Gateway Core
//!
//! Core types and error handling for the LLM relay gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - The exposed chat-completion request envelope
//! - Completion and streaming chunk types in the exposed wire format
//! - Provider and guardrail identifiers
//! - The tagged pipeline error and its status/code table

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod request;
pub mod response;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorCode, GatewayError, GatewayResult};
pub use request::{ChatMessage, ChatRequest, MessageRole, PassthroughFields};
pub use response::{ChatCompletion, Choice, FinishReason, ResponseMessage, Usage};
pub use streaming::{ChatChunk, ChunkChoice, ChunkDelta, DONE_FRAME};
pub use types::{GuardrailDetection, GuardrailStage, ProviderName, RequestId};
