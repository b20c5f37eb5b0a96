//! Reasoning strategies.
//!
//! A strategy turns one question into one or more model calls and a final
//! label. The set is closed ([`Strategy`]); configuration picks a variant by
//! name through the [`StrategyRegistry`].
//!
//! | key | calls | terminates when |
//! |---|---|---|
//! | `Direct` | 1 | always |
//! | `CoT` | 1 | always |
//! | `ReAct` | up to `max_rounds` (8) | `<final_answer>` or a standalone label |
//! | `Debate` | up to `max_rounds` (3) x roles | a judge turn yields an answer |

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use reasonbench_core::{AnswerExtractor, PromptTemplate, SolveResult, TemplateError};

use crate::config::ConfigError;
use crate::prompts;
use crate::providers::{LlmProvider, ProviderError};

mod debate;
mod react;
mod single_pass;

pub use debate::{DebateRole, DebateStrategy, DEFAULT_DEBATE_ROUNDS};
pub use react::{ReactStrategy, DEFAULT_REACT_ROUNDS};
pub use single_pass::SinglePassStrategy;

/// Errors that end a strategy invocation for one sample.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Prompt rendering failed: {0}")]
    Template(#[from] TemplateError),
}

/// The strategy variants, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Direct,
    CoT,
    ReAct,
    Debate,
}

impl StrategyKind {
    /// Every variant, in display order.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Direct,
        StrategyKind::CoT,
        StrategyKind::ReAct,
        StrategyKind::Debate,
    ];

    /// Canonical configuration key.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "Direct",
            StrategyKind::CoT => "CoT",
            StrategyKind::ReAct => "ReAct",
            StrategyKind::Debate => "Debate",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured strategy, ready to solve samples.
#[derive(Debug, Clone)]
pub enum Strategy {
    Direct(SinglePassStrategy),
    CoT(SinglePassStrategy),
    ReAct(ReactStrategy),
    Debate(DebateStrategy),
}

impl Strategy {
    /// Which variant this is.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Direct(_) => StrategyKind::Direct,
            Strategy::CoT(_) => StrategyKind::CoT,
            Strategy::ReAct(_) => StrategyKind::ReAct,
            Strategy::Debate(_) => StrategyKind::Debate,
        }
    }

    /// Answer one question.
    ///
    /// Calls within a sample are strictly sequential. A provider error ends
    /// the invocation; an answer the extractor cannot find does not.
    pub async fn solve(
        &self,
        provider: &dyn LlmProvider,
        extractor: &AnswerExtractor,
        question: &str,
    ) -> Result<SolveResult, SolveError> {
        match self {
            Strategy::Direct(s) | Strategy::CoT(s) => {
                s.solve(provider, extractor, question, self.kind()).await
            }
            Strategy::ReAct(s) => s.solve(provider, extractor, question).await,
            Strategy::Debate(s) => s.solve(provider, extractor, question).await,
        }
    }
}

/// Inputs a strategy constructor may use. Unset fields take strategy defaults.
#[derive(Debug, Clone, Default)]
pub struct StrategySettings {
    /// Custom template; the built-in one is used when `None`
    pub template: Option<PromptTemplate>,

    /// Round limit for ReAct and Debate
    pub max_rounds: Option<u32>,

    /// Debate roles
    pub roles: Option<Vec<DebateRole>>,
}

impl StrategySettings {
    fn template_or_default(&self, kind: StrategyKind) -> PromptTemplate {
        self.template
            .clone()
            .unwrap_or_else(|| prompts::default_template(kind))
    }
}

/// Builds a strategy from settings.
pub type StrategyConstructor = fn(&StrategySettings) -> Result<Strategy, ConfigError>;

/// Maps configuration keys to strategy constructors.
#[derive(Clone)]
pub struct StrategyRegistry {
    constructors: BTreeMap<String, StrategyConstructor>,
}

impl StrategyRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with every built-in strategy, plus the `React` alias.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(StrategyKind::Direct.as_str(), build_direct);
        registry.register(StrategyKind::CoT.as_str(), build_cot);
        registry.register(StrategyKind::ReAct.as_str(), build_react);
        registry.register("React", build_react);
        registry.register(StrategyKind::Debate.as_str(), build_debate);
        registry
    }

    /// Register a constructor. An existing key is replaced.
    pub fn register(&mut self, key: impl Into<String>, constructor: StrategyConstructor) {
        self.constructors.insert(key.into(), constructor);
    }

    /// Registered keys, sorted.
    pub fn available(&self) -> Vec<&str> {
        self.constructors.keys().map(|s| s.as_str()).collect()
    }

    /// Build the strategy registered under `key`.
    pub fn build(&self, key: &str, settings: &StrategySettings) -> Result<Strategy, ConfigError> {
        let constructor = self
            .constructors
            .get(key)
            .ok_or_else(|| ConfigError::UnknownStrategy {
                name: key.to_string(),
                available: self.available().join(", "),
            })?;
        constructor(settings)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.available())
            .finish()
    }
}

fn build_direct(settings: &StrategySettings) -> Result<Strategy, ConfigError> {
    let template = settings.template_or_default(StrategyKind::Direct);
    Ok(Strategy::Direct(SinglePassStrategy::new(template)?))
}

fn build_cot(settings: &StrategySettings) -> Result<Strategy, ConfigError> {
    let template = settings.template_or_default(StrategyKind::CoT);
    Ok(Strategy::CoT(SinglePassStrategy::new(template)?))
}

fn build_react(settings: &StrategySettings) -> Result<Strategy, ConfigError> {
    let template = settings.template_or_default(StrategyKind::ReAct);
    let rounds = settings.max_rounds.unwrap_or(DEFAULT_REACT_ROUNDS);
    Ok(Strategy::ReAct(ReactStrategy::new(template, rounds)?))
}

fn build_debate(settings: &StrategySettings) -> Result<Strategy, ConfigError> {
    let template = settings.template_or_default(StrategyKind::Debate);
    let rounds = settings.max_rounds.unwrap_or(DEFAULT_DEBATE_ROUNDS);
    let roles = settings.roles.clone().unwrap_or_else(prompts::default_roles);
    Ok(Strategy::Debate(DebateStrategy::new(template, rounds, roles)?))
}

pub(crate) fn check_rounds(max_rounds: u32) -> Result<u32, ConfigError> {
    if max_rounds == 0 {
        Err(ConfigError::Invalid("max_rounds must be at least 1".to_string()))
    } else {
        Ok(max_rounds)
    }
}
