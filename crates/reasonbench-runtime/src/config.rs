//! Run configuration.
//!
//! One YAML file describes a run: dataset, optional prompt file, output
//! directory, the model, and the reasoning method. Relative paths resolve
//! against the directory holding the config file.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use reasonbench_core::{LabelSet, PromptTemplate, TemplateError, TokenUsage};

use crate::orchestrator::ErrorPolicy;
use crate::providers::{GenerationConfig, ProviderError, ProviderRegistry};
use crate::strategies::{DebateRole, Strategy, StrategyRegistry, StrategySettings};

/// Errors in run configuration. All are detected before any sample runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown strategy '{name}'. Available: {available}")]
    UnknownStrategy { name: String, available: String },

    #[error("Provider configuration error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_concurrency() -> usize {
    1
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

// Accepts "90s" / "2m" strings or a bare number of seconds.
fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => humantime::parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn ser_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

/// Model settings, shared by every provider type.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registered provider type (`openai`, `openrouter`, `scripted`)
    pub model_type: String,

    /// Model identifier sent to the provider
    pub model_name: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(
        default = "default_timeout",
        deserialize_with = "de_duration",
        serialize_with = "ser_duration"
    )]
    pub timeout: Duration,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Retries for retryable errors; 0 disables the retry decorator
    #[serde(default)]
    pub max_retries: usize,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    /// Canned responses for `model_type: scripted`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<String>,

    /// Usage the scripted provider reports with every response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripted_usage: Option<TokenUsage>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: String::new(),
            model_name: String::new(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout: default_timeout(),
            api_key: None,
            api_key_env: None,
            max_retries: 0,
            extra_headers: BTreeMap::new(),
            responses: Vec::new(),
            scripted_usage: None,
        }
    }
}

impl ModelConfig {
    /// Offline configuration replaying `responses`.
    pub fn scripted<I, S>(model_name: impl Into<String>, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model_type: "scripted".to_string(),
            model_name: model_name.into(),
            responses: responses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Per-request settings handed to HTTP providers.
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.model_name.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("model_type", &self.model_type)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("max_retries", &self.max_retries)
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reasoning method settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodConfig {
    /// Strategy key (`Direct`, `CoT`, `ReAct`, `Debate`)
    pub method_name: String,

    /// Round limit (ReAct, Debate)
    #[serde(default)]
    pub max_rounds: Option<u32>,

    /// Debate roles; the built-in three when absent
    #[serde(default)]
    pub roles: Option<Vec<DebateRole>>,
}

/// A complete run description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_name: String,

    /// Dataset JSON file
    pub input_file: PathBuf,

    /// Template file; the strategy's built-in template when absent
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub max_samples: Option<usize>,

    /// Samples in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub on_error: ErrorPolicy,

    #[serde(default)]
    pub labels: LabelSet,

    pub model: ModelConfig,

    pub method: MethodConfig,
}

/// Command-line overrides applied on top of a loaded config.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub method_name: Option<String>,
    pub max_samples: Option<usize>,
    pub concurrency: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub model_name: Option<String>,
}

impl RunConfig {
    /// Parse a config from YAML text. Paths are left as written.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config file and resolve its relative paths against the file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_yaml(&contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    /// Make relative paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        self.input_file = resolve(&self.input_file);
        self.output_dir = resolve(&self.output_dir);
        self.prompt_file = self.prompt_file.as_deref().map(resolve);
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, overrides: RunOverrides) {
        if let Some(method) = overrides.method_name {
            self.method.method_name = method;
        }
        if let Some(max) = overrides.max_samples {
            self.max_samples = Some(max);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(model) = overrides.model_name {
            self.model.model_name = model;
        }
    }

    /// Strategy inputs from the method section and prompt file.
    pub fn strategy_settings(&self) -> Result<StrategySettings, ConfigError> {
        let template = self
            .prompt_file
            .as_ref()
            .map(PromptTemplate::from_file)
            .transpose()?;

        Ok(StrategySettings {
            template,
            max_rounds: self.method.max_rounds,
            roles: self.method.roles.clone(),
        })
    }

    /// Build the configured strategy.
    pub fn build_strategy(&self, registry: &StrategyRegistry) -> Result<Strategy, ConfigError> {
        registry.build(&self.method.method_name, &self.strategy_settings()?)
    }

    /// Check everything that can be checked without touching the dataset.
    pub fn validate(
        &self,
        strategies: &StrategyRegistry,
        providers: &ProviderRegistry,
    ) -> Result<(), ConfigError> {
        if self.run_name.trim().is_empty() {
            return Err(ConfigError::Invalid("run_name must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }

        self.build_strategy(strategies)?;
        providers.validate(&self.model)?;
        Ok(())
    }
}
