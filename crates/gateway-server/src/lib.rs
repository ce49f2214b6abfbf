//! # Gateway Server
//!
//! HTTP surface of the LLM relay gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server with graceful shutdown
//! - The OpenAI-compatible `POST /v1/chat/completions` endpoint
//! - The request pipeline: rate limiting, response caching, guardrails,
//!   routing and upstream dispatch
//! - Request correlation ids and the uniform error envelope

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;

// Re-export main types
pub use error::{ApiError, ErrorDetail, ErrorEnvelope};
pub use routes::create_router;
pub use server::{shutdown_signal, Server, ServerError};
pub use service::{CallContext, ChatService};
pub use state::{AppState, AppStateBuilder};
