//! Multi-agent debate: roles speak in turn, round after round, until a judge
//! commits to an answer.

use serde::{Deserialize, Serialize};

use reasonbench_core::{
    AnswerExtractor, DebateParams, PromptTemplate, RoundRecord, RoundTags, SolveResult,
    TemplateParams,
};

use super::{check_rounds, SolveError};
use crate::config::ConfigError;
use crate::prompts::DEBATE_EMPTY_HISTORY;
use crate::providers::LlmProvider;

/// Round limit when none is configured.
pub const DEFAULT_DEBATE_ROUNDS: u32 = 3;

/// Name that marks a role as the judge without an explicit flag.
pub const JUDGE_ROLE_NAME: &str = "Judge";

/// One debate participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateRole {
    pub name: String,
    pub goal: String,

    /// Only judge turns can end the debate
    #[serde(default)]
    pub judge: bool,
}

impl DebateRole {
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            judge: false,
        }
    }

    /// A role flagged as judge regardless of its name.
    pub fn judge(name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            judge: true,
            ..Self::new(name, goal)
        }
    }

    pub fn is_judge(&self) -> bool {
        self.judge || self.name == JUDGE_ROLE_NAME
    }
}

#[derive(Debug, Clone)]
pub struct DebateStrategy {
    template: PromptTemplate,
    max_rounds: u32,
    roles: Vec<DebateRole>,
}

impl DebateStrategy {
    pub fn new(
        template: PromptTemplate,
        max_rounds: u32,
        roles: Vec<DebateRole>,
    ) -> Result<Self, ConfigError> {
        for field in DebateParams::FIELDS {
            template.require(field)?;
        }
        template.check::<DebateParams>()?;

        if roles.is_empty() {
            return Err(ConfigError::Invalid(
                "debate needs at least one role".to_string(),
            ));
        }
        if let Some(role) = roles.iter().find(|r| r.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "debate role with goal '{}' has no name",
                role.goal
            )));
        }
        if !roles.iter().any(DebateRole::is_judge) {
            tracing::warn!(
                roles = ?roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
                "No judge role; the debate will run every round"
            );
        }

        Ok(Self {
            template,
            max_rounds: check_rounds(max_rounds)?,
            roles,
        })
    }

    pub(super) async fn solve(
        &self,
        provider: &dyn LlmProvider,
        extractor: &AnswerExtractor,
        question: &str,
    ) -> Result<SolveResult, SolveError> {
        let mut steps: Vec<RoundRecord> = Vec::new();
        let mut llm_results = Vec::new();
        let mut outputs: Vec<String> = Vec::new();
        let mut final_answer = String::new();
        let mut last_prompt = String::new();

        'rounds: for round in 1..=self.max_rounds {
            for role in &self.roles {
                let history = format_history(&steps);
                let prompt = self.template.render(&DebateParams {
                    role_name: &role.name,
                    role_goal: &role.goal,
                    debate_history: if history.is_empty() {
                        DEBATE_EMPTY_HISTORY
                    } else {
                        history.as_str()
                    },
                    question,
                })?;

                let result = provider.generate(&prompt).await?;
                let text = result.text.trim().to_string();
                llm_results.push(result);

                let extracted = extractor.final_answer(&text);
                tracing::debug!(
                    strategy = "Debate",
                    round,
                    agent = %role.name,
                    prompt_len = prompt.len(),
                    response_len = text.len(),
                    answer = %extracted,
                    "Model call complete"
                );

                outputs.push(format!("[Round {}][{}]\n{}", round, role.name, text));
                steps.push(RoundRecord {
                    round,
                    agent: Some(role.name.clone()),
                    role_goal: Some(role.goal.clone()),
                    prompt: prompt.clone(),
                    raw_response: text,
                    tags: RoundTags {
                        final_answer: Some(extracted.clone()),
                        ..Default::default()
                    },
                });
                last_prompt = prompt;

                if role.is_judge() && !extracted.is_empty() {
                    tracing::debug!(strategy = "Debate", round, agent = %role.name, "Judge reached a verdict");
                    final_answer = extracted;
                    break 'rounds;
                }
            }
        }

        if final_answer.is_empty() {
            if let Some(last) = steps.last() {
                final_answer = extractor.final_answer(&last.raw_response);
            }
            tracing::debug!(
                strategy = "Debate",
                turns = steps.len(),
                answer = %final_answer,
                "Round limit reached without a verdict"
            );
        }

        Ok(SolveResult {
            final_answer,
            raw_output: outputs.join("\n\n"),
            raw_input: last_prompt,
            llm_results,
            intermediate_steps: steps,
        })
    }
}

/// `[Round r][Agent] response` per turn, newline joined.
fn format_history(steps: &[RoundRecord]) -> String {
    steps
        .iter()
        .map(|s| {
            format!(
                "[Round {}][{}] {}",
                s.round,
                s.agent.as_deref().unwrap_or_default(),
                s.raw_response
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{default_roles, DEBATE_TEMPLATE};
    use crate::providers::ScriptedProvider;
    use reasonbench_core::TemplateError;

    fn debate(rounds: u32) -> DebateStrategy {
        DebateStrategy::new(PromptTemplate::new(DEBATE_TEMPLATE), rounds, default_roles()).unwrap()
    }

    #[tokio::test]
    async fn test_judge_verdict_ends_debate() {
        let provider = ScriptedProvider::new([
            "I argue for B.",
            "I doubt that.",
            "Weighing both: <final_answer>B</final_answer>",
        ]);
        let result = debate(3)
            .solve(&provider, &AnswerExtractor::default(), "Q?")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 3);
        assert_eq!(result.final_answer, "B");
        assert_eq!(result.intermediate_steps.len(), 3);
        assert_eq!(result.intermediate_steps[2].agent.as_deref(), Some("Judge"));
    }

    #[tokio::test]
    async fn test_only_judge_can_end_debate() {
        // Proponent commits to a label, Judge does not: the debate continues.
        let provider = ScriptedProvider::new([
            "Clearly the answer is:\nA",
            "Not convinced.",
            "Need more discussion.",
            "Still A",
            "Fine.",
            "<final_answer>A</final_answer>",
        ]);
        let result = debate(3)
            .solve(&provider, &AnswerExtractor::default(), "Q?")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 6);
        assert_eq!(result.final_answer, "A");

        let first = &result.intermediate_steps[0];
        assert_eq!(first.agent.as_deref(), Some("Proponent"));
        assert_eq!(first.tags.final_answer.as_deref(), Some("A"));
        assert_eq!(result.intermediate_steps[2].tags.final_answer.as_deref(), Some(""));
        assert_eq!(result.intermediate_steps[3].round, 2);
    }

    #[tokio::test]
    async fn test_no_verdict_falls_back_to_last_turn() {
        let provider = ScriptedProvider::new(["no opinion"]);
        let result = debate(2)
            .solve(&provider, &AnswerExtractor::default(), "Q?")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 6);
        assert_eq!(result.final_answer, "");
    }

    #[tokio::test]
    async fn test_history_and_raw_output_format() {
        let provider = ScriptedProvider::new(["first", "second", "<final_answer>C</final_answer>"]);
        let result = debate(1)
            .solve(&provider, &AnswerExtractor::default(), "Q?")
            .await
            .unwrap();

        let prompts = provider.prompts();
        assert!(prompts[0].contains(DEBATE_EMPTY_HISTORY));
        assert!(prompts[0].contains("You are Proponent"));
        assert!(prompts[2].contains("[Round 1][Proponent] first\n[Round 1][Skeptic] second"));
        assert_eq!(result.raw_input, prompts[2]);

        assert_eq!(
            result.raw_output,
            "[Round 1][Proponent]\nfirst\n\n[Round 1][Skeptic]\nsecond\n\n[Round 1][Judge]\n<final_answer>C</final_answer>"
        );
    }

    #[tokio::test]
    async fn test_flagged_judge_with_custom_name() {
        let roles = vec![
            DebateRole::new("Solver", "solve it"),
            DebateRole::judge("Arbiter", "decide"),
        ];
        let strategy = DebateStrategy::new(PromptTemplate::new(DEBATE_TEMPLATE), 3, roles).unwrap();
        let provider = ScriptedProvider::new(["B", "<final_answer>D</final_answer>"]);
        let result = strategy
            .solve(&provider, &AnswerExtractor::default(), "Q?")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(result.final_answer, "D");
    }

    #[tokio::test]
    async fn test_last_turn_fallback_without_judge() {
        let roles = vec![
            DebateRole::new("Solver", "solve it"),
            DebateRole::new("Critic", "find flaws"),
        ];
        let strategy = DebateStrategy::new(PromptTemplate::new(DEBATE_TEMPLATE), 2, roles).unwrap();
        let provider = ScriptedProvider::new([
            "Maybe B.",
            "Leaning C.",
            "Still B?",
            "<final_answer>C</final_answer>",
        ]);
        let result = strategy
            .solve(&provider, &AnswerExtractor::default(), "Q?")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 4);
        assert_eq!(result.final_answer, "C");
        assert_eq!(result.intermediate_steps[3].agent.as_deref(), Some("Critic"));
    }

    #[test]
    fn test_template_must_place_every_debate_field() {
        for missing in ["{role_name}", "{role_goal}", "{debate_history}", "{question}"] {
            let source = DEBATE_TEMPLATE.replace(missing, "");
            let err = DebateStrategy::new(PromptTemplate::new(source), 3, default_roles())
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Template(TemplateError::MissingPlaceholder(_))),
                "{} accepted",
                missing
            );
        }
    }

    #[test]
    fn test_roles_required() {
        let err = DebateStrategy::new(PromptTemplate::new(DEBATE_TEMPLATE), 3, vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_role_deserializes_without_flag() {
        let role: DebateRole =
            serde_yaml::from_str("name: Judge\ngoal: decide").unwrap();
        assert!(role.is_judge());
        assert!(!role.judge);
    }
}
