//! Batch-level metrics: accuracy and summed token usage.

use serde::{Deserialize, Serialize};

use crate::types::{ResultRecord, TokenUsage};

/// Aggregate metrics over a batch of result records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    /// Records in the batch
    pub num_samples: usize,

    /// Records with a non-empty gold answer
    pub num_scored: usize,

    /// Scored records whose prediction matched
    pub num_correct: usize,

    /// `num_correct / num_scored`, or 0.0 when nothing was scored
    pub accuracy: f64,

    /// Usage summed over every record
    pub total_token_usage: TokenUsage,
}

impl Metrics {
    /// Compute metrics for a batch.
    pub fn from_records(records: &[ResultRecord]) -> Self {
        let (num_scored, num_correct) = score(records);
        Self {
            num_samples: records.len(),
            num_scored,
            num_correct,
            accuracy: ratio(num_correct, num_scored),
            total_token_usage: aggregate_token_usage(records),
        }
    }
}

/// Metrics plus the run they describe, as written to `metrics.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsReport {
    pub run_name: String,
    pub method: String,
    pub data_file: String,
    pub model_type: String,
    pub model_name: String,

    #[serde(flatten)]
    pub metrics: Metrics,
}

fn normalize(answer: &str) -> String {
    answer.trim().to_uppercase()
}

fn score(records: &[ResultRecord]) -> (usize, usize) {
    records
        .iter()
        .filter_map(|r| {
            let gold = normalize(r.gold_answer.as_deref().unwrap_or(""));
            if gold.is_empty() {
                None
            } else {
                Some(gold == normalize(&r.pred_answer))
            }
        })
        .fold((0, 0), |(total, correct), hit| (total + 1, correct + usize::from(hit)))
}

fn ratio(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// Fraction of records with a gold answer whose prediction matches it.
///
/// Records without a gold answer count toward neither side. An empty
/// prediction is always wrong.
pub fn compute_accuracy(records: &[ResultRecord]) -> f64 {
    let (total, correct) = score(records);
    ratio(correct, total)
}

/// Sum usage over records, keeping fields null when no record reported them.
pub fn aggregate_token_usage(records: &[ResultRecord]) -> TokenUsage {
    records.iter().map(|r| r.usage).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(gold: &str, pred: &str, total: Option<u64>) -> ResultRecord {
        ResultRecord {
            id: serde_json::Value::Null,
            question: String::new(),
            gold_answer: Some(gold.to_string()),
            pred_answer: pred.to_string(),
            raw_input: String::new(),
            raw_output: String::new(),
            usage: TokenUsage {
                prompt_tokens: None,
                completion_tokens: None,
                total_tokens: total,
            },
            intermediate_steps: None,
        }
    }

    #[test]
    fn test_accuracy_excludes_missing_gold() {
        let records = vec![
            record("A", "A", None),
            record("B", "C", None),
            record("", "A", None),
        ];
        assert_eq!(compute_accuracy(&records), 0.5);
    }

    #[test]
    fn test_accuracy_normalizes_case_and_whitespace() {
        let records = vec![record(" b ", "B", None)];
        assert_eq!(compute_accuracy(&records), 1.0);
    }

    #[test]
    fn test_empty_prediction_is_wrong() {
        let records = vec![record("A", "", None)];
        assert_eq!(compute_accuracy(&records), 0.0);
    }

    #[test]
    fn test_no_records() {
        assert_eq!(compute_accuracy(&[]), 0.0);
        let metrics = Metrics::from_records(&[]);
        assert_eq!(metrics.num_samples, 0);
        assert!(metrics.total_token_usage.is_unreported());
    }

    #[test]
    fn test_null_gold_is_excluded() {
        let mut r = record("A", "A", None);
        r.gold_answer = None;
        let metrics = Metrics::from_records(&[r, record("B", "B", None)]);
        assert_eq!(metrics.num_scored, 1);
        assert_eq!(metrics.num_correct, 1);
        assert_eq!(metrics.accuracy, 1.0);
    }

    #[test]
    fn test_usage_totals_across_records() {
        let records = vec![
            record("A", "A", Some(12)),
            record("B", "A", None),
            record("C", "C", Some(8)),
        ];
        let metrics = Metrics::from_records(&records);
        assert_eq!(metrics.total_token_usage.total_tokens, Some(20));
        assert_eq!(metrics.total_token_usage.prompt_tokens, None);
        assert_eq!(metrics.num_samples, 3);
    }

    #[test]
    fn test_report_flattens_metrics() {
        let report = MetricsReport {
            run_name: "demo".to_string(),
            method: "CoT".to_string(),
            data_file: "data.json".to_string(),
            model_type: "openai".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            metrics: Metrics::from_records(&[record("A", "A", Some(3))]),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["accuracy"], 1.0);
        assert_eq!(json["total_token_usage"]["total_tokens"], 3);
        assert_eq!(json["method"], "CoT");
    }
}
