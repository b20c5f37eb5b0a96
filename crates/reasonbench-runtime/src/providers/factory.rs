//! Provider factory pattern for dynamic provider registration.
//!
//! Each provider type registers a factory under its `model_type` key; the run
//! configuration picks one by name.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create(&run_config.model)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{LlmProvider, ProviderError, RetryingProvider};
use crate::config::ModelConfig;

/// Factory for creating providers from a model configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier, matched against `model.model_type`.
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance.
    fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate configuration (including credential availability) without
    /// creating a provider.
    fn validate_config(&self, config: &ModelConfig) -> Result<(), ProviderError>;

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "LLM Provider"
    }
}

/// Registry of available provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory.
    ///
    /// If a factory with the same type already exists, it will be replaced.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }

    /// Create the provider for `config.model_type`, wrapped in a
    /// [`RetryingProvider`] when `max_retries > 0`.
    pub fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = self.factory(&config.model_type)?.create(config)?;

        if config.max_retries > 0 {
            Ok(Arc::new(RetryingProvider::new(provider, config.max_retries)))
        } else {
            Ok(provider)
        }
    }

    /// Validate configuration for `config.model_type`.
    pub fn validate(&self, config: &ModelConfig) -> Result<(), ProviderError> {
        self.factory(&config.model_type)?.validate_config(config)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider type is registered.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Registered types with their descriptions.
    pub fn describe(&self) -> Vec<(&str, &'static str)> {
        self.factories
            .iter()
            .map(|(k, f)| (k.as_str(), f.description()))
            .collect()
    }

    /// Create a registry with all built-in providers registered.
    ///
    /// `scripted` is always present; HTTP providers follow the enabled features.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::ScriptedProviderFactory));

        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiProviderFactory));

        #[cfg(feature = "openrouter")]
        registry.register(Arc::new(super::OpenRouterProviderFactory));

        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
