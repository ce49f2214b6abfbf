//! Provider registry.

use crate::adapter::ProviderAdapter;
use crate::anthropic::{AnthropicConfig, AnthropicProvider};
use crate::openai::{OpenAIConfig, OpenAIProvider};
use gateway_config::GatewayConfig;
use gateway_core::{GatewayError, ProviderName};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Adapters keyed by provider
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderName, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build both adapters from configuration, reading credentials from the
    /// environment variables the configuration names.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Like [`Self::from_config`] with an explicit credential lookup
    pub fn from_config_with<F>(config: &GatewayConfig, lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_key = resolve_key(ProviderName::OpenAI, &config.providers.openai.api_key_env, &lookup);
        let anthropic_key = resolve_key(
            ProviderName::Anthropic,
            &config.providers.anthropic.api_key_env,
            &lookup,
        );

        let mut registry = Self::new();
        registry.register(Arc::new(OpenAIProvider::new(OpenAIConfig::from_settings(
            &config.providers.openai,
            openai_key,
            config.timeout,
        ))?));
        registry.register(Arc::new(AnthropicProvider::new(
            AnthropicConfig::from_settings(&config.providers.anthropic, anthropic_key, config.timeout),
        )?));

        info!(providers = registry.len(), "Provider registry initialized");
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for the same provider
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    /// Adapter for `provider`
    #[must_use]
    pub fn get(&self, provider: ProviderName) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    /// Number of registered adapters
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapter is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

fn resolve_key<F>(provider: ProviderName, env_name: &str, lookup: &F) -> Option<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(env_name).filter(|value| !value.trim().is_empty()) {
        Some(value) => Some(SecretString::new(value)),
        None => {
            warn!(
                provider = %provider,
                env = env_name,
                "API key not set; upstream calls will be unauthenticated"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_registers_both_providers() {
        let registry = ProviderRegistry::from_config_with(&GatewayConfig::default(), |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        })
        .expect("registry builds");

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(ProviderName::OpenAI).expect("openai").name(),
            ProviderName::OpenAI
        );
        assert_eq!(
            registry.get(ProviderName::Anthropic).expect("anthropic").name(),
            ProviderName::Anthropic
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(ProviderName::OpenAI).is_none());
    }
}
