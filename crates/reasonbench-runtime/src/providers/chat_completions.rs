//! OpenAI-compatible `/chat/completions` client.
//!
//! Used by both the OpenAI and OpenRouter flavours, which differ only in base
//! URL, default headers, and credential variable. Each prompt is sent as a
//! fixed system message plus one user message.

use reasonbench_core::GenerationResult;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{secrets::ApiCredential, ChatMessage, GenerationConfig, ProviderError};
use crate::config::ModelConfig;

#[cfg(feature = "http")]
use {
    super::LlmProvider,
    async_trait::async_trait,
    std::collections::BTreeMap,
    std::time::Duration,
};

/// System message sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Chat-completions response body. Only the fields we read.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
fn request_body<'a>(prompt: &str, config: &'a GenerationConfig) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

/// Turn a chat-completions response body into a [`GenerationResult`].
///
/// Missing content becomes empty text; missing usage stays `None`. The full
/// body is kept in `raw`.
pub fn parse_completion(raw: JsonValue) -> Result<GenerationResult, ProviderError> {
    let body: ChatResponse =
        serde_json::from_value(raw.clone()).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let text = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default();

    let (prompt_tokens, completion_tokens, total_tokens) = match body.usage {
        Some(u) => (u.prompt_tokens, u.completion_tokens, u.total_tokens),
        None => (None, None, None),
    };

    Ok(GenerationResult {
        text,
        prompt_tokens,
        completion_tokens,
        total_tokens,
        raw,
    })
}

/// Error message from a non-2xx body, falling back to the raw text.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
fn error_message(body: &str) -> String {
    serde_json::from_str::<ChatError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Checks shared by every chat-completions flavour.
pub(crate) fn validate_http_config(
    config: &ModelConfig,
    default_key_env: &str,
    flavour: &str,
) -> Result<(), ProviderError> {
    if config.model_name.trim().is_empty() {
        return Err(ProviderError::NotConfigured(format!(
            "{} provider needs 'model_name'",
            flavour
        )));
    }

    let key_env = config.api_key_env.as_deref().unwrap_or(default_key_env);
    if !ApiCredential::is_available(config.api_key.as_deref(), key_env) {
        return Err(ProviderError::NotConfigured(format!(
            "{} API key required: set 'api_key' in config or {} env",
            flavour, key_env
        )));
    }

    if let Some(url) = &config.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::NotConfigured(
                "base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

/// Chat-completions provider over `reqwest`.
#[cfg(feature = "http")]
pub struct ChatCompletionsProvider {
    name: String,
    credential: ApiCredential,
    base_url: String,
    headers: BTreeMap<String, String>,
    config: GenerationConfig,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl std::fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("name", &self.name)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[cfg(feature = "http")]
impl ChatCompletionsProvider {
    pub fn new(
        name: impl Into<String>,
        credential: ApiCredential,
        base_url: impl Into<String>,
        headers: BTreeMap<String, String>,
        config: GenerationConfig,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            credential,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
            config,
            client,
        })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            // SECURITY: Only expose the credential here, at the point of use
            .bearer_auth(self.credential.expose())
            .timeout(self.config.timeout)
            .json(&request_body(prompt, &self.config));

        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.config.timeout)
            } else {
                ProviderError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let raw: JsonValue = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parse_completion(raw)
    }

    async fn health_check(&self) -> bool {
        // Credential presence only; no request is sent
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Thinking...\nB"}}],
            "usage": {"prompt_tokens": 50, "completion_tokens": 7, "total_tokens": 57}
        });
        let result = parse_completion(raw.clone()).unwrap();

        assert_eq!(result.text, "Thinking...\nB");
        assert_eq!(result.prompt_tokens, Some(50));
        assert_eq!(result.completion_tokens, Some(7));
        assert_eq!(result.total_tokens, Some(57));
        assert_eq!(result.raw, raw);
    }

    #[test]
    fn test_parse_null_content_and_missing_usage() {
        let raw = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        });
        let result = parse_completion(raw).unwrap();

        assert_eq!(result.text, "");
        assert_eq!(result.total_tokens, None);
    }

    #[test]
    fn test_parse_no_choices() {
        let result = parse_completion(serde_json::json!({"choices": []})).unwrap();
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_completion(serde_json::json!("oops")),
            Err(ProviderError::ParseError(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let config = GenerationConfig {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            ..Default::default()
        };
        let body = serde_json::to_value(request_body("Q?", &config)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Q?");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error": {"message": "model not found", "type": "invalid_request_error"}}"#),
            "model not found"
        );
        assert_eq!(error_message("  upstream down "), "upstream down");
    }

    #[test]
    fn test_validate_http_config() {
        let mut config = ModelConfig {
            model_type: "openai".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            ..ModelConfig::default()
        };
        assert!(validate_http_config(&config, "REASONBENCH_UNSET_KEY", "OpenAI").is_ok());

        config.base_url = Some("ftp://example.com".to_string());
        assert!(validate_http_config(&config, "REASONBENCH_UNSET_KEY", "OpenAI").is_err());

        config.base_url = None;
        config.api_key = None;
        let err = validate_http_config(&config, "REASONBENCH_UNSET_KEY", "OpenAI").unwrap_err();
        assert!(err.to_string().contains("REASONBENCH_UNSET_KEY"));
    }
}
