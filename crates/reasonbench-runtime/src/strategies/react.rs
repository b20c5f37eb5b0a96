//! ReAct: rounds of thought, action and observation until the model commits.
//!
//! Each round re-sends the base prompt with the transcript of every earlier
//! response. A round ends the loop when it carries a non-empty
//! `<final_answer>` tag or a standalone label.

use reasonbench_core::{
    extract_tag, AnswerExtractor, PromptTemplate, ReactParams, RoundRecord, RoundTags,
    SolveResult, TemplateError,
};

use super::{check_rounds, SolveError};
use crate::config::ConfigError;
use crate::prompts::{REACT_CONTINUATION, REACT_EMPTY_HISTORY, REACT_HISTORY_HEADER};
use crate::providers::LlmProvider;

/// Round limit when none is configured.
pub const DEFAULT_REACT_ROUNDS: u32 = 8;

#[derive(Debug, Clone)]
pub struct ReactStrategy {
    template: PromptTemplate,
    max_rounds: u32,
}

impl ReactStrategy {
    /// The template must use `{question}` and may place `{history}` itself.
    pub fn new(template: PromptTemplate, max_rounds: u32) -> Result<Self, ConfigError> {
        template.require("question")?;
        template.check::<ReactParams>()?;
        Ok(Self {
            template,
            max_rounds: check_rounds(max_rounds)?,
        })
    }

    /// Prompt for the next round given the transcript so far.
    pub fn build_prompt(&self, question: &str, transcript: &str) -> Result<String, TemplateError> {
        let history = if transcript.is_empty() {
            REACT_EMPTY_HISTORY
        } else {
            transcript
        };
        let base = self.template.render(&ReactParams { question, history })?;

        if self.template.references("history") {
            Ok(format!("{}\n\n{}", base, REACT_CONTINUATION))
        } else {
            Ok(format!(
                "{}\n\n{}\n{}\n\n{}",
                base, REACT_HISTORY_HEADER, history, REACT_CONTINUATION
            ))
        }
    }

    pub(super) async fn solve(
        &self,
        provider: &dyn LlmProvider,
        extractor: &AnswerExtractor,
        question: &str,
    ) -> Result<SolveResult, SolveError> {
        let mut steps: Vec<RoundRecord> = Vec::new();
        let mut llm_results = Vec::new();
        let mut final_answer = String::new();
        let mut last_prompt = String::new();

        for round in 1..=self.max_rounds {
            let transcript = steps
                .iter()
                .map(|s| s.raw_response.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = self.build_prompt(question, &transcript)?;

            let result = provider.generate(&prompt).await?;
            let text = result.text.trim().to_string();
            llm_results.push(result);

            let tags = RoundTags {
                thought: extract_tag(&text, "thought"),
                action: extract_tag(&text, "action"),
                observation: extract_tag(&text, "observation"),
                final_answer: extractor.tagged_final_answer(&text),
            };

            let decided = match &tags.final_answer {
                Some(answer) => Some(answer.clone()),
                None => Some(extractor.extract(&text)).filter(|a| !a.is_empty()),
            };

            tracing::debug!(
                strategy = "ReAct",
                round,
                prompt_len = prompt.len(),
                response_len = text.len(),
                tagged = tags.final_answer.is_some(),
                "Model call complete"
            );

            steps.push(RoundRecord {
                round,
                agent: None,
                role_goal: None,
                prompt: prompt.clone(),
                raw_response: text,
                tags,
            });
            last_prompt = prompt;

            if let Some(answer) = decided {
                tracing::debug!(strategy = "ReAct", round, answer = %answer, "Terminated with answer");
                final_answer = answer;
                break;
            }
        }

        if final_answer.is_empty() {
            if let Some(last) = steps.last() {
                final_answer = extractor.extract(&last.raw_response);
            }
            tracing::debug!(
                strategy = "ReAct",
                rounds = steps.len(),
                answer = %final_answer,
                "Round limit reached"
            );
        }

        let raw_output = steps
            .iter()
            .map(|s| s.raw_response.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(SolveResult {
            final_answer,
            raw_output,
            raw_input: last_prompt,
            llm_results,
            intermediate_steps: steps,
        })
    }
}
