//! # LLM Relay Gateway
//!
//! OpenAI-compatible relay that routes chat completions to OpenAI-compatible
//! or Anthropic upstreams, transcoding requests, responses and streams where
//! the upstream schema differs.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! llm-relay-gateway
//!
//! # Start with custom config file
//! llm-relay-gateway --config /path/to/config.yaml
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 GATEWAY_GUARDRAILS_ENABLED=true llm-relay-gateway
//! ```

use anyhow::Context;
use clap::Parser;
use gateway_config::{ConfigLoader, GatewayConfig};
use gateway_providers::ProviderRegistry;
use gateway_server::{AppState, Server};
use gateway_telemetry::init_logging;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "llm-relay-gateway", version, about)]
struct Cli {
    /// Configuration file (YAML, or TOML with a .toml extension)
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().await.context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;

    if cli.check {
        info!("Configuration is valid");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting LLM Relay Gateway"
    );

    run(config).await
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        default_provider = %config.routing.default_provider,
        timeout = ?config.timeout,
        rate_limit_rpm = config.rate_limit.requests_per_minute,
        cache_ttl = ?config.cache.ttl,
        guardrails = config.guardrails.enabled,
        guardrail_mode = %config.guardrails.mode,
        "Configuration loaded"
    );

    let registry =
        ProviderRegistry::from_config(&config).context("Failed to build provider registry")?;

    let state = AppState::builder()
        .config(config.clone())
        .providers(registry)
        .build();

    Server::new(config.server, state)
        .run()
        .await
        .context("Server failed")?;

    Ok(())
}
