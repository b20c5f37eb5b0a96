//! Text-generation providers for reasonbench-runtime.
//!
//! Every strategy talks to a model through [`LlmProvider::generate`]: one
//! prompt in, one [`GenerationResult`] out. Implementations include an
//! OpenAI-compatible chat-completions client (OpenAI and OpenRouter flavours),
//! an offline [`ScriptedProvider`], and the [`RetryingProvider`] decorator.
//!
//! ## Security
//!
//! HTTP providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use reasonbench_core::GenerationResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod chat_completions;
mod factory;
mod retry;
mod scripted;
pub mod secrets;

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openrouter")]
mod openrouter;

pub use chat_completions::{parse_completion, SYSTEM_PROMPT};
pub use factory::{ProviderFactory, ProviderRegistry};
pub use retry::RetryingProvider;
pub use scripted::{ScriptedProvider, ScriptedProviderFactory};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "http")]
pub use chat_completions::ChatCompletionsProvider;

#[cfg(feature = "openai")]
pub use openai::{OpenAiProviderFactory, OPENAI_API_KEY_ENV, OPENAI_BASE_URL_ENV};

#[cfg(feature = "openrouter")]
pub use openrouter::{OpenRouterProviderFactory, OPENROUTER_API_KEY_ENV};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::HttpError(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            ProviderError::ParseError(_)
            | ProviderError::AuthError
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// Per-request generation settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Provider abstraction allows swapping model backends.
///
/// Strategies are the only callers. A provider never retries on its own;
/// wrap it in [`RetryingProvider`] for that.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the completion.
    ///
    /// An empty completion is `Ok` with empty text, not an error.
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError>;

    /// Check if provider is usable.
    async fn health_check(&self) -> bool;

    /// Get provider name for logs.
    fn name(&self) -> &str;
}
