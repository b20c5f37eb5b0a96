//! Offline provider that replays canned responses.
//!
//! Responses are returned in order and cycle once exhausted. Every prompt is
//! recorded so callers can inspect exactly what a strategy sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use reasonbench_core::GenerationResult;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{factory::ProviderFactory, LlmProvider, ProviderError};
use crate::config::ModelConfig;

#[derive(Debug, Default)]
struct ScriptState {
    next: usize,
    calls: usize,
    prompts: Vec<String>,
}

/// Replays a fixed script of responses.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    script: Vec<GenerationResult>,
    failing_calls: BTreeSet<usize>,
    state: Mutex<ScriptState>,
}

impl ScriptedProvider {
    /// Script of plain-text responses without usage.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(GenerationResult::text).collect())
    }

    /// Script of full results, including usage.
    pub fn from_results(script: Vec<GenerationResult>) -> Self {
        Self {
            name: "scripted".to_string(),
            script,
            failing_calls: BTreeSet::new(),
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Make the `call`-th request (1-based) fail with a 500 instead of
    /// replying. A failed call does not advance the script.
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    /// Set the name reported by [`LlmProvider::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of `generate` calls so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().prompts.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.prompts.push(prompt.to_string());

        if self.failing_calls.contains(&state.calls) {
            return Err(ProviderError::ApiError {
                status: 500,
                message: format!("scripted failure on call {}", state.calls),
            });
        }

        if self.script.is_empty() {
            return Ok(GenerationResult::default());
        }

        let result = self.script[state.next % self.script.len()].clone();
        state.next += 1;
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory for `model_type: scripted`. Responses come from `model.responses`.
pub struct ScriptedProviderFactory;

impl ProviderFactory for ScriptedProviderFactory {
    fn provider_type(&self) -> &'static str {
        "scripted"
    }

    fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;

        let usage = config.scripted_usage.unwrap_or_default();
        let script = config
            .responses
            .iter()
            .map(|text| GenerationResult {
                text: text.clone(),
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                ..Default::default()
            })
            .collect();

        Ok(Arc::new(
            ScriptedProvider::from_results(script)
                .with_name(format!("scripted/{}", config.model_name)),
        ))
    }

    fn validate_config(&self, config: &ModelConfig) -> Result<(), ProviderError> {
        if config.responses.is_empty() {
            return Err(ProviderError::NotConfigured(
                "scripted provider needs at least one entry in 'responses'".to_string(),
            ));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Replays configured responses (offline dry runs)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasonbench_core::TokenUsage;

    #[tokio::test]
    async fn test_replays_in_order_and_cycles() {
        let provider = ScriptedProvider::new(["one", "two"]);
        assert_eq!(provider.generate("a").await.unwrap().text, "one");
        assert_eq!(provider.generate("b").await.unwrap().text, "two");
        assert_eq!(provider.generate("c").await.unwrap().text, "one");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_advance_script() {
        let provider = ScriptedProvider::new(["one", "two"]).fail_on_call(2);
        assert_eq!(provider.generate("a").await.unwrap().text, "one");
        assert!(matches!(
            provider.generate("b").await,
            Err(ProviderError::ApiError { status: 500, .. })
        ));
        assert_eq!(provider.generate("c").await.unwrap().text, "two");
    }

    #[tokio::test]
    async fn test_usage_is_replayed() {
        let provider =
            ScriptedProvider::from_results(vec![GenerationResult::text("A").with_usage(7, 1)]);
        let result = provider.generate("p").await.unwrap();
        assert_eq!(result.total_tokens, Some(8));
    }

    #[test]
    fn test_factory_requires_responses() {
        let config = ModelConfig::scripted("dry", Vec::<String>::new());
        assert!(ScriptedProviderFactory.validate_config(&config).is_err());

        let config = ModelConfig::scripted("dry", ["A"]);
        let provider = ScriptedProviderFactory.create(&config).unwrap();
        assert_eq!(provider.name(), "scripted/dry");
    }

    #[tokio::test]
    async fn test_factory_applies_configured_usage() {
        let config = ModelConfig {
            scripted_usage: Some(TokenUsage {
                prompt_tokens: Some(12),
                completion_tokens: Some(3),
                total_tokens: Some(15),
            }),
            ..ModelConfig::scripted("dry", ["A"])
        };
        let provider = ScriptedProviderFactory.create(&config).unwrap();
        let result = provider.generate("p").await.unwrap();
        assert_eq!(result.text, "A");
        assert_eq!(result.total_tokens, Some(15));
    }
}
