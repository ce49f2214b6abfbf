//! Model to provider router.

use gateway_config::RoutingConfig;
use gateway_core::ProviderName;
use std::collections::HashMap;
use tracing::trace;

/// Resolves the upstream provider for a model identifier.
///
/// Lookups never fail: unknown models fall through to the default provider.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    models: HashMap<String, ProviderName>,
    default_provider: ProviderName,
}

impl ModelRouter {
    /// Create a router from an explicit table and default
    #[must_use]
    pub fn new(models: HashMap<String, ProviderName>, default_provider: ProviderName) -> Self {
        Self {
            models,
            default_provider,
        }
    }

    /// Create a router from routing configuration
    #[must_use]
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.models.clone(), config.default_provider)
    }

    /// Provider for `model`
    #[must_use]
    pub fn resolve_provider(&self, model: &str) -> ProviderName {
        let provider = self
            .models
            .get(model)
            .copied()
            .unwrap_or(self.default_provider);
        trace!(model, provider = %provider, "Resolved provider");
        provider
    }

    /// Default provider
    #[must_use]
    pub fn default_provider(&self) -> ProviderName {
        self.default_provider
    }
}
