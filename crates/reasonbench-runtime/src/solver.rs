//! Per-sample run: strategy, provider, and extractor bundled together.

use std::sync::Arc;

use reasonbench_core::{AnswerExtractor, ResultRecord, Sample, SolveResult};

use crate::providers::LlmProvider;
use crate::strategies::{SolveError, Strategy};

/// Runs one configured strategy against one provider.
///
/// Cheap to share across tasks: the provider is behind an `Arc` and the
/// strategy and extractor are immutable.
pub struct Solver {
    provider: Arc<dyn LlmProvider>,
    strategy: Strategy,
    extractor: AnswerExtractor,
}

impl Solver {
    pub fn new(provider: Arc<dyn LlmProvider>, strategy: Strategy, extractor: AnswerExtractor) -> Self {
        Self {
            provider,
            strategy,
            extractor,
        }
    }

    /// Run the strategy on one sample's question.
    pub async fn solve(&self, sample: &Sample) -> Result<SolveResult, SolveError> {
        self.strategy
            .solve(self.provider.as_ref(), &self.extractor, &sample.question)
            .await
    }

    /// Solve one sample and flatten the outcome into a [`ResultRecord`].
    ///
    /// Token usage is summed over every model call the strategy made.
    pub async fn run_sample(&self, sample: &Sample) -> Result<ResultRecord, SolveError> {
        let solved = self.solve(sample).await?;
        let calls = solved.call_count();
        let record = ResultRecord::from_solve(sample, solved);

        tracing::debug!(
            id = %sample.id,
            strategy = %self.strategy.kind(),
            calls,
            pred = %record.pred_answer,
            total_tokens = ?record.usage.total_tokens,
            "Sample solved"
        );
        Ok(record)
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("provider", &self.provider.name())
            .field("strategy", &self.strategy.kind())
            .field("labels", self.extractor.labels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;
    use crate::strategies::{StrategyRegistry, StrategySettings};
    use reasonbench_core::GenerationResult;

    fn solver(method: &str, provider: ScriptedProvider) -> Solver {
        let strategy = StrategyRegistry::with_defaults()
            .build(method, &StrategySettings::default())
            .unwrap();
        Solver::new(Arc::new(provider), strategy, AnswerExtractor::default())
    }

    fn usage(total: Option<u64>) -> GenerationResult {
        GenerationResult {
            text: "thinking".to_string(),
            total_tokens: total,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_sample_flattens_direct() {
        let solver = solver("Direct", ScriptedProvider::new(["Reasoning...\nC"]));
        let sample = Sample::new(3, "Which? A) x B) y C) z", "C");

        let record = solver.run_sample(&sample).await.unwrap();

        assert_eq!(record.id, serde_json::json!(3));
        assert_eq!(record.pred_answer, "C");
        assert_eq!(record.gold_answer.as_deref(), Some("C"));
        assert!(record.raw_input.contains("Which? A) x B) y C) z"));
        assert_eq!(record.raw_output, "Reasoning...\nC");
        assert!(record.intermediate_steps.is_none());
    }

    #[tokio::test]
    async fn test_token_usage_summed_across_calls() {
        // Three ReAct rounds reporting 10, nothing, 5
        let mut last = usage(Some(5));
        last.text = "<final_answer>A</final_answer>".to_string();
        let provider = ScriptedProvider::from_results(vec![usage(Some(10)), usage(None), last]);
        let solver = solver("ReAct", provider);

        let record = solver.run_sample(&Sample::new(1, "Q?", "A")).await.unwrap();

        assert_eq!(record.usage.total_tokens, Some(15));
        assert_eq!(record.usage.prompt_tokens, None);
        assert_eq!(record.intermediate_steps.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_token_usage_all_absent_stays_null() {
        let provider =
            ScriptedProvider::from_results(vec![usage(None), usage(None), usage(None)]);
        let strategy = StrategyRegistry::with_defaults()
            .build(
                "ReAct",
                &StrategySettings {
                    max_rounds: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        let solver = Solver::new(Arc::new(provider), strategy, AnswerExtractor::default());

        let record = solver.run_sample(&Sample::new(1, "Q?", "A")).await.unwrap();

        assert_eq!(record.pred_answer, "");
        assert_eq!(record.usage.total_tokens, None);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let solver = solver("CoT", ScriptedProvider::new(["A"]).fail_on_call(1));
        let err = solver.run_sample(&Sample::new(1, "Q?", "A")).await.unwrap_err();
        assert!(matches!(err, SolveError::Provider(_)));
    }
}
