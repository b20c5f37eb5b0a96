//! OpenAI (and OpenAI-compatible) chat-completions provider.
//!
//! ## Security
//!
//! The API key is loaded through [`ApiCredential`] and only exposed when the
//! `Authorization` header is built.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    chat_completions::{validate_http_config, ChatCompletionsProvider},
    factory::ProviderFactory,
    secrets::ApiCredential,
    LlmProvider, ProviderError,
};
use crate::config::ModelConfig;

/// Environment variable name for the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the base URL (for compatible deployments).
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Base URL: config, then `OPENAI_BASE_URL`, then the public endpoint.
fn resolve_base_url(config: &ModelConfig) -> String {
    config
        .base_url
        .clone()
        .or_else(|| {
            std::env::var(OPENAI_BASE_URL_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Factory for `model_type: openai`.
///
/// ## Configuration Format
/// ```yaml
/// model:
///   model_type: openai
///   model_name: gpt-4o-mini
///   base_url: null              # optional, else OPENAI_BASE_URL, else api.openai.com
///   api_key_env: OPENAI_API_KEY # optional
///   extra_headers: {}           # optional
/// ```
pub struct OpenAiProviderFactory;

impl ProviderFactory for OpenAiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "openai"
    }

    fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;

        let key_env = config.api_key_env.as_deref().unwrap_or(OPENAI_API_KEY_ENV);
        let credential = ApiCredential::resolve(config.api_key.as_deref(), key_env, "OpenAI API key")?;

        let headers: BTreeMap<String, String> = config.extra_headers.clone();
        let provider = ChatCompletionsProvider::new(
            "openai",
            credential,
            resolve_base_url(config),
            headers,
            config.generation(),
        )?;

        tracing::debug!(provider = ?provider, "Created provider");
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &ModelConfig) -> Result<(), ProviderError> {
        validate_http_config(config, OPENAI_API_KEY_ENV, "OpenAI")
    }

    fn description(&self) -> &'static str {
        "OpenAI chat completions (or any compatible endpoint)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        ModelConfig {
            model_type: "openai".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = ModelConfig {
            base_url: Some("http://localhost:8000/v1".to_string()),
            ..config()
        };
        assert_eq!(resolve_base_url(&config), "http://localhost:8000/v1");
    }

    #[test]
    fn test_create_with_inline_key() {
        let provider = OpenAiProviderFactory.create(&config()).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = ModelConfig {
            api_key: None,
            api_key_env: Some("REASONBENCH_OPENAI_UNSET".to_string()),
            ..config()
        };
        assert!(matches!(
            OpenAiProviderFactory.create(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
