//! Core data model shared by strategies, the run template, and the batch driver.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::iter::Sum;

/// One multiple-choice question record from the dataset.
///
/// Only `id`, `question` and `answer` are interpreted. Everything else is kept
/// in `extra` and ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Sample {
    /// Record identifier (any JSON scalar)
    #[serde(default)]
    pub id: JsonValue,

    /// Question text, including the answer options
    pub question: String,

    /// Gold label; absent or empty means the sample is not scored
    #[serde(default, rename = "answer", deserialize_with = "de_gold_answer")]
    pub gold_answer: Option<String>,

    /// Fields the evaluator does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Sample {
    /// Create a sample with an id, question, and gold label.
    pub fn new(id: impl Into<JsonValue>, question: impl Into<String>, gold: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            gold_answer: Some(gold.into()),
            extra: BTreeMap::new(),
        }
    }
}

// Gold answers show up as strings, numbers, or null depending on who built the dataset.
fn de_gold_answer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Outcome of one call to a text-generation provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenerationResult {
    /// Completion text (empty when the provider returned nothing)
    pub text: String,

    /// Tokens in the prompt, if reported
    pub prompt_tokens: Option<u64>,

    /// Tokens in the completion, if reported
    pub completion_tokens: Option<u64>,

    /// Total tokens, if reported
    pub total_tokens: Option<u64>,

    /// Provider payload kept for debugging
    #[serde(default)]
    pub raw: JsonValue,
}

impl GenerationResult {
    /// A result carrying only text and no usage.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach usage numbers.
    pub fn with_usage(mut self, prompt: u64, completion: u64) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self.total_tokens = Some(prompt + completion);
        self
    }
}

/// Tags parsed out of one model turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RoundTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

/// One model call inside a multi-round strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    /// 1-based round index
    pub round: u32,

    /// Acting agent (debate only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Goal of the acting agent (debate only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_goal: Option<String>,

    /// Exact prompt sent
    pub prompt: String,

    /// Trimmed response text
    pub raw_response: String,

    #[serde(flatten)]
    pub tags: RoundTags,
}

/// Everything a strategy produced for one sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolveResult {
    /// Extracted label, or empty when nothing was found
    pub final_answer: String,

    /// All round texts in order
    pub raw_output: String,

    /// The last prompt sent
    pub raw_input: String,

    /// One entry per model call, in call order
    pub llm_results: Vec<GenerationResult>,

    /// Per-round trace for multi-round strategies
    pub intermediate_steps: Vec<RoundRecord>,
}

impl SolveResult {
    /// Number of model calls made.
    pub fn call_count(&self) -> usize {
        self.llm_results.len()
    }
}

/// Token usage where every field stays `None` until some call reports it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    /// Usage reported by a single call.
    pub fn of(result: &GenerationResult) -> Self {
        Self {
            prompt_tokens: result.prompt_tokens,
            completion_tokens: result.completion_tokens,
            total_tokens: result.total_tokens,
        }
    }

    /// Field-wise sum. Absent counts as zero, but a field stays absent
    /// unless at least one side reported it.
    pub fn combine(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: add_reported(self.prompt_tokens, other.prompt_tokens),
            completion_tokens: add_reported(self.completion_tokens, other.completion_tokens),
            total_tokens: add_reported(self.total_tokens, other.total_tokens),
        }
    }

    /// True when no field was ever reported.
    pub fn is_unreported(&self) -> bool {
        self.prompt_tokens.is_none() && self.completion_tokens.is_none() && self.total_tokens.is_none()
    }
}

fn add_reported(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::default(), TokenUsage::combine)
    }
}

impl<'a> Sum<&'a GenerationResult> for TokenUsage {
    fn sum<I: Iterator<Item = &'a GenerationResult>>(iter: I) -> Self {
        iter.map(TokenUsage::of).sum()
    }
}

/// The persisted, flattened outcome for one sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    pub id: JsonValue,
    pub question: String,
    pub gold_answer: Option<String>,
    pub pred_answer: String,
    pub raw_input: String,
    pub raw_output: String,
    pub usage: TokenUsage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_steps: Option<Vec<RoundRecord>>,
}

impl ResultRecord {
    /// Flatten a strategy result into a record for `sample`.
    pub fn from_solve(sample: &Sample, solved: SolveResult) -> Self {
        let usage: TokenUsage = solved.llm_results.iter().sum();
        let intermediate_steps = if solved.intermediate_steps.is_empty() {
            None
        } else {
            Some(solved.intermediate_steps)
        };

        Self {
            id: sample.id.clone(),
            question: sample.question.clone(),
            gold_answer: sample.gold_answer.clone(),
            pred_answer: solved.final_answer,
            raw_input: solved.raw_input,
            raw_output: solved.raw_output,
            usage,
            intermediate_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_total(total: Option<u64>) -> GenerationResult {
        GenerationResult {
            total_tokens: total,
            ..Default::default()
        }
    }

    #[test]
    fn test_usage_sum_skips_absent_values() {
        let results = vec![with_total(Some(10)), with_total(None), with_total(Some(5))];
        let usage: TokenUsage = results.iter().sum();
        assert_eq!(usage.total_tokens, Some(15));
        assert_eq!(usage.prompt_tokens, None);
    }

    #[test]
    fn test_usage_sum_all_absent_stays_null() {
        let results = vec![with_total(None), with_total(None), with_total(None)];
        let usage: TokenUsage = results.iter().sum();
        assert_eq!(usage.total_tokens, None);
        assert!(usage.is_unreported());
    }

    #[test]
    fn test_usage_reported_zero_is_not_null() {
        let results = vec![with_total(Some(0)), with_total(None)];
        let usage: TokenUsage = results.iter().sum();
        assert_eq!(usage.total_tokens, Some(0));
    }

    #[test]
    fn test_unreported_usage_serializes_as_null() {
        let json = serde_json::to_value(TokenUsage::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt_tokens": null,
                "completion_tokens": null,
                "total_tokens": null
            })
        );
    }

    #[test]
    fn test_sample_parses_extra_fields_and_numeric_gold() {
        let sample: Sample = serde_json::from_value(serde_json::json!({
            "id": 7,
            "question": "Pick one",
            "answer": 3,
            "subject": "math"
        }))
        .unwrap();

        assert_eq!(sample.id, serde_json::json!(7));
        assert_eq!(sample.gold_answer.as_deref(), Some("3"));
        assert_eq!(sample.extra["subject"], "math");
    }

    #[test]
    fn test_sample_without_answer() {
        let sample: Sample =
            serde_json::from_value(serde_json::json!({"question": "No gold here"})).unwrap();
        assert_eq!(sample.gold_answer, None);
        assert!(sample.id.is_null());
    }

    #[test]
    fn test_record_drops_empty_steps() {
        let sample = Sample::new(1, "Q", "A");
        let solved = SolveResult {
            final_answer: "A".to_string(),
            raw_output: "A".to_string(),
            raw_input: "prompt".to_string(),
            llm_results: vec![GenerationResult::text("A").with_usage(3, 1)],
            intermediate_steps: vec![],
        };

        let record = ResultRecord::from_solve(&sample, solved);
        assert_eq!(record.pred_answer, "A");
        assert_eq!(record.usage.total_tokens, Some(4));
        assert!(record.intermediate_steps.is_none());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("intermediate_steps").is_none());
    }

    #[test]
    fn test_round_record_flattens_tags() {
        let record = RoundRecord {
            round: 1,
            agent: None,
            role_goal: None,
            prompt: "p".to_string(),
            raw_response: "r".to_string(),
            tags: RoundTags {
                thought: Some("think".to_string()),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["thought"], "think");
        assert!(json.get("action").is_none());
        assert!(json.get("agent").is_none());
    }
}
