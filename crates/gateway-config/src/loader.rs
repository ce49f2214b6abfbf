//! Configuration loading from file and environment.

use crate::config::GatewayConfig;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

/// Builder that assembles a [`GatewayConfig`] from an optional file and
/// `GATEWAY_*` environment overrides, then validates it.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_overrides: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader with environment overrides enabled and no file
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            env_overrides: true,
        }
    }

    /// Read configuration from the given file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable or disable `GATEWAY_*` overrides
    #[must_use]
    pub fn with_env_overrides(mut self, enabled: bool) -> Self {
        self.env_overrides = enabled;
        self
    }

    /// Load, override and validate
    pub async fn load(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.file {
            Some(path) => Self::read_file(path).await?,
            None => {
                debug!("No configuration file given, using defaults");
                GatewayConfig::default()
            }
        };

        if self.env_overrides {
            apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        }

        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            GatewayConfig::from_toml_str(&contents)?
        } else {
            GatewayConfig::from_yaml_str(&contents)?
        };

        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }
}

/// Apply `GATEWAY_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = parse_var(&lookup, "GATEWAY_PORT")? {
        config.server.port = port;
    }
    if let Some(timeout) = duration_var(&lookup, "GATEWAY_TIMEOUT")? {
        config.timeout = timeout;
    }
    if let Some(rpm) = parse_var(&lookup, "GATEWAY_RATE_LIMIT_RPM")? {
        config.rate_limit.requests_per_minute = rpm;
    }
    if let Some(ttl) = duration_var(&lookup, "GATEWAY_CACHE_TTL")? {
        config.cache.ttl = ttl;
    }
    if let Some(enabled) = parse_var(&lookup, "GATEWAY_GUARDRAILS_ENABLED")? {
        config.guardrails.enabled = enabled;
    }
    if let Some(mode) = parse_var(&lookup, "GATEWAY_GUARDRAILS_MODE")? {
        config.guardrails.mode = mode;
    }
    if let Some(provider) = parse_var(&lookup, "GATEWAY_DEFAULT_PROVIDER")? {
        config.routing.default_provider = provider;
    }
    if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = parse_var(&lookup, "GATEWAY_LOG_FORMAT")? {
        config.logging.format = format;
    }
    Ok(())
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
                name,
                message: e.to_string(),
            })
        })
        .transpose()
}

// Durations accept humantime ("30s", "2m") or a bare number of seconds.
fn duration_var<F>(lookup: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            let raw = raw.trim();
            if let Ok(secs) = raw.parse::<u64>() {
                return Ok(Duration::from_secs(secs));
            }
            humantime_serde::re::humantime::parse_duration(raw).map_err(|e| {
                ConfigError::InvalidEnv {
                    name,
                    message: e.to_string(),
                }
            })
        })
        .transpose()
}
