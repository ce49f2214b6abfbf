//! # Gateway Providers
//!
//! Upstream provider adapters for the LLM relay gateway.
//!
//! Two adapter variants are provided:
//! - OpenAI-compatible (passthrough): the request envelope and the upstream
//!   response travel unchanged
//! - Anthropic (transcoding): requests and responses, including streamed
//!   output, are rewritten between the Messages API and the chat-completion
//!   schema

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod anthropic;
pub mod client;
pub mod openai;
pub mod registry;
pub mod streaming;

// Re-export main types
pub use adapter::{ByteStream, ProviderAdapter, UpstreamBody, UpstreamResponse};
pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use registry::ProviderRegistry;
pub use streaming::{transcode_stream, StreamTranscoder};
