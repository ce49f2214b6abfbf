//! Gateway configuration model.

use gateway_core::ProviderName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Root gateway configuration.
///
/// Built once at startup and handed to each component constructor.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// HTTP server settings
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Model to provider routing
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Upstream provider endpoints
    #[serde(default)]
    #[validate(nested)]
    pub providers: ProvidersConfig,

    /// Single absolute deadline for one upstream call
    #[serde(default = "default_timeout", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub timeout: Duration,

    /// Per-client rate limiting
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Content inspection
    #[serde(default)]
    pub guardrails: GuardrailConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            routing: RoutingConfig::default(),
            providers: ProvidersConfig::default(),
            timeout: default_timeout(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            guardrails: GuardrailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(input: &str) -> Result<Self, crate::ConfigError> {
        serde_yaml::from_str(input).map_err(|e| crate::ConfigError::Parse(e.to_string()))
    }

    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, crate::ConfigError> {
        toml::from_str(input).map_err(|e| crate::ConfigError::Parse(e.to_string()))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Grace period for in-flight requests on shutdown
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` socket address string
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Model routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Provider used for models absent from `models`
    #[serde(default = "default_provider")]
    pub default_provider: ProviderName,

    /// Explicit model to provider table
    #[serde(default = "default_model_table")]
    pub models: HashMap<String, ProviderName>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            models: default_model_table(),
        }
    }
}

/// Upstream provider endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProvidersConfig {
    /// OpenAI-compatible upstream
    #[serde(default)]
    #[validate(nested)]
    pub openai: OpenAISettings,

    /// Anthropic-compatible upstream
    #[serde(default)]
    #[validate(nested)]
    pub anthropic: AnthropicSettings,
}

/// OpenAI-compatible upstream settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenAISettings {
    /// Full URL of the chat completions endpoint
    #[serde(default = "default_openai_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            api_key_env: default_openai_key_env(),
        }
    }
}

/// Anthropic-compatible upstream settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnthropicSettings {
    /// Full URL of the messages endpoint
    #[serde(default = "default_anthropic_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,

    /// Value sent in the `anthropic-version` header
    #[serde(default = "default_anthropic_version")]
    #[validate(length(min = 1))]
    pub api_version: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            endpoint: default_anthropic_endpoint(),
            api_key_env: default_anthropic_key_env(),
            api_version: default_anthropic_version(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Bucket capacity and refill per minute
    #[serde(default = "default_rpm")]
    #[validate(range(min = 1))]
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a stored entry
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_cache_ttl(),
        }
    }
}

/// Guardrail configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Whether inspection runs at all
    #[serde(default)]
    pub enabled: bool,

    /// What to do on a detection
    #[serde(default)]
    pub mode: GuardrailMode,
}

/// Guardrail operating mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailMode {
    /// Record detections, let the request through
    #[default]
    Log,
    /// Reject on any detection
    Block,
}

impl FromStr for GuardrailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "block" => Ok(Self::Block),
            other => Err(format!("unknown guardrail mode '{other}'")),
        }
    }
}

impl fmt::Display for GuardrailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => f.write_str("log"),
            Self::Block => f.write_str("block"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_provider() -> ProviderName {
    ProviderName::OpenAI
}

fn default_model_table() -> HashMap<String, ProviderName> {
    let openai = [
        "gpt-4o",
        "gpt-4o-mini",
        "gpt-4-turbo",
        "gpt-4",
        "gpt-3.5-turbo",
    ];
    let anthropic = [
        "claude-3-opus",
        "claude-3-sonnet",
        "claude-3-haiku",
        "claude-3-5-sonnet",
        "claude-3-5-haiku",
        "claude-3-7-sonnet",
    ];

    openai
        .iter()
        .map(|m| ((*m).to_string(), ProviderName::OpenAI))
        .chain(
            anthropic
                .iter()
                .map(|m| ((*m).to_string(), ProviderName::Anthropic)),
        )
        .collect()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_rpm() -> u32 {
    60
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();

        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limit.requests_per_minute, 60);
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert!(!config.guardrails.enabled);
        assert_eq!(config.guardrails.mode, GuardrailMode::Log);
        assert_eq!(config.routing.default_provider, ProviderName::OpenAI);
        assert_eq!(
            config.routing.models.get("claude-3-5-sonnet"),
            Some(&ProviderName::Anthropic)
        );
        assert_eq!(config.providers.anthropic.api_version, "2023-06-01");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_document() {
        let config = GatewayConfig::from_yaml_str(
            r"
timeout: 5s
rate_limit:
  requests_per_minute: 10
routing:
  default_provider: secondary
  models:
    my-model: primary
guardrails:
  enabled: true
  mode: block
providers:
  openai:
    endpoint: http://localhost:9000/v1/chat/completions
",
        )
        .expect("parse yaml");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.rate_limit.requests_per_minute, 10);
        assert_eq!(config.routing.default_provider, ProviderName::Anthropic);
        assert_eq!(config.routing.models.len(), 1);
        assert_eq!(config.guardrails.mode, GuardrailMode::Block);
        assert_eq!(
            config.providers.openai.endpoint,
            "http://localhost:9000/v1/chat/completions"
        );
        assert_eq!(config.providers.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_toml_document() {
        let config = GatewayConfig::from_toml_str(
            r#"
timeout = "2s"

[server]
port = 9090

[cache]
ttl = "5m"

[logging]
format = "json"
"#,
        )
        .expect("parse toml");

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.rate_limit.requests_per_minute = 0;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.providers.anthropic.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_and_format_parsing() {
        assert_eq!("BLOCK".parse::<GuardrailMode>(), Ok(GuardrailMode::Block));
        assert!("warn".parse::<GuardrailMode>().is_err());
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
    }
}
