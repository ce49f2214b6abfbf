//! # Gateway Config
//!
//! Configuration for the LLM relay gateway.
//!
//! A [`GatewayConfig`] is assembled once at startup by [`ConfigLoader`]
//! (YAML or TOML file, then `GATEWAY_*` environment overrides, then
//! validation) and passed explicitly into each component.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    AnthropicSettings, CacheConfig, GatewayConfig, GuardrailConfig, GuardrailMode, LogFormat,
    LoggingConfig, OpenAISettings, ProvidersConfig, RateLimitConfig, RoutingConfig, ServerConfig,
};
pub use error::ConfigError;
pub use loader::{apply_overrides, ConfigLoader};
