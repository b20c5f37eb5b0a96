//! OpenRouter provider: the chat-completions client with OpenRouter's base
//! URL and attribution headers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    chat_completions::{validate_http_config, ChatCompletionsProvider},
    factory::ProviderFactory,
    secrets::ApiCredential,
    LlmProvider, ProviderError,
};
use crate::config::ModelConfig;

/// Environment variable name for the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Attribution headers OpenRouter uses for app rankings.
const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("HTTP-Referer", "http://localhost"),
    ("X-Title", "Reasoning-Framework-Experiment"),
];

/// Default headers overlaid with configured ones (configured values win).
fn merged_headers(config: &ModelConfig) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = DEFAULT_HEADERS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    headers.extend(config.extra_headers.clone());
    headers
}

/// Factory for `model_type: openrouter`.
pub struct OpenRouterProviderFactory;

impl ProviderFactory for OpenRouterProviderFactory {
    fn provider_type(&self) -> &'static str {
        "openrouter"
    }

    fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;

        let key_env = config.api_key_env.as_deref().unwrap_or(OPENROUTER_API_KEY_ENV);
        let credential =
            ApiCredential::resolve(config.api_key.as_deref(), key_env, "OpenRouter API key")?;

        let provider = ChatCompletionsProvider::new(
            "openrouter",
            credential,
            config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            merged_headers(config),
            config.generation(),
        )?;

        tracing::debug!(provider = ?provider, "Created provider");
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &ModelConfig) -> Result<(), ProviderError> {
        validate_http_config(config, OPENROUTER_API_KEY_ENV, "OpenRouter")
    }

    fn description(&self) -> &'static str {
        "OpenRouter chat completions"
    }
}
