//! One call, one extraction. Shared by Direct and Chain-of-Thought, which
//! differ only in their template.

use reasonbench_core::{AnswerExtractor, PromptTemplate, QuestionParams, SolveResult};

use super::{SolveError, StrategyKind};
use crate::config::ConfigError;
use crate::providers::LlmProvider;

#[derive(Debug, Clone)]
pub struct SinglePassStrategy {
    template: PromptTemplate,
}

impl SinglePassStrategy {
    /// The template must use `{question}` and nothing else.
    pub fn new(template: PromptTemplate) -> Result<Self, ConfigError> {
        template.require("question")?;
        template.check::<QuestionParams>()?;
        Ok(Self { template })
    }

    pub(super) async fn solve(
        &self,
        provider: &dyn LlmProvider,
        extractor: &AnswerExtractor,
        question: &str,
        kind: StrategyKind,
    ) -> Result<SolveResult, SolveError> {
        let prompt = self.template.render(&QuestionParams { question })?;
        let result = provider.generate(&prompt).await?;

        let final_answer = extractor.extract(&result.text);
        tracing::debug!(
            strategy = %kind,
            prompt_len = prompt.len(),
            response_len = result.text.len(),
            total_tokens = ?result.total_tokens,
            answer = %final_answer,
            "Model call complete"
        );

        Ok(SolveResult {
            final_answer,
            raw_output: result.text.clone(),
            raw_input: prompt,
            llm_results: vec![result],
            intermediate_steps: Vec::new(),
        })
    }
}
