//! # reasonbench-core
//!
//! Deterministic building blocks for evaluating reasoning strategies on
//! multiple-choice questions.
//!
//! Nothing in this crate talks to a model. It owns:
//! - the data model (samples, generation results, per-sample records)
//! - answer extraction from free-form model text
//! - prompt templates with typed placeholders
//! - dataset loading with schema validation
//! - accuracy and token-usage metrics
//!
//! ## Example
//!
//! ```rust
//! use reasonbench_core::{extract_choice, extract_tag};
//!
//! assert_eq!(extract_choice("Let me think...\nC"), "C");
//! assert_eq!(extract_choice("The answer is likely B or C"), "");
//! assert_eq!(
//!     extract_tag("<final_answer> B </final_answer>", "final_answer").as_deref(),
//!     Some("B")
//! );
//! ```

pub mod dataset;
pub mod extract;
pub mod metrics;
pub mod template;
pub mod types;

// Re-export main types at crate root
pub use dataset::{load_dataset, parse_dataset, validate_dataset_schema, DatasetError};
pub use extract::{extract_choice, extract_tag, AnswerExtractor, LabelSet, FINAL_ANSWER_TAG};
pub use metrics::{aggregate_token_usage, compute_accuracy, Metrics, MetricsReport};
pub use template::{
    DebateParams, PromptTemplate, QuestionParams, ReactParams, TemplateError, TemplateParams,
};
pub use types::{
    GenerationResult, ResultRecord, RoundRecord, RoundTags, Sample, SolveResult, TokenUsage,
};
