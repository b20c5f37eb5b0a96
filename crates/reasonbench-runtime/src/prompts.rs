//! Built-in prompt templates and the fixed text the strategies add around them.
//!
//! Templates use `{placeholder}` fields rendered by
//! [`reasonbench_core::PromptTemplate`]. A run can replace the template with
//! its own `prompt_file`. The scaffolding constants below are not configurable.

use reasonbench_core::PromptTemplate;

use crate::strategies::{DebateRole, StrategyKind};

/// Direct answer: no reasoning requested, label only.
pub const DIRECT_TEMPLATE: &str = r#"Answer the following multiple-choice question.

{question}

Reply with the letter of the correct option only, on its own line."#;

/// Chain-of-Thought: reason first, label on the final line.
pub const COT_TEMPLATE: &str = r#"Answer the following multiple-choice question.

{question}

Think through the problem step by step. When you are done, write the letter
of the correct option alone on the last line."#;

/// ReAct: interleaved thought, action and observation tags.
pub const REACT_TEMPLATE: &str = r#"You are solving a multiple-choice question by alternating reasoning and actions.

Question:
{question}

Each round, respond with:
<thought>your reasoning for this step</thought>
<action>the check or calculation you perform</action>
<observation>what the action shows</observation>

When you are confident, respond with <final_answer>LETTER</final_answer> instead."#;

/// Debate: one role speaks per turn with the whole debate so far.
pub const DEBATE_TEMPLATE: &str = r#"You are {role_name} in a structured debate about a multiple-choice question.
Your goal: {role_goal}

Question:
{question}

Debate so far:
{debate_history}

Give your contribution for this turn. If you reach a verdict, state it as
<final_answer>LETTER</final_answer>."#;

/// Header placed before the ReAct transcript.
pub const REACT_HISTORY_HEADER: &str = "Previous rounds:";

/// ReAct transcript placeholder before the first round.
pub const REACT_EMPTY_HISTORY: &str = "(No previous rounds. Start with round 1.)";

/// Instruction appended to every ReAct prompt.
pub const REACT_CONTINUATION: &str = "Continue from the rounds above: output the next <thought> and <action>, \
or a <final_answer>. Every <action> must be followed by its <observation>.";

/// Debate history placeholder before anyone has spoken.
pub const DEBATE_EMPTY_HISTORY: &str = "(No turns yet. You speak first.)";

/// Built-in template text for a strategy.
pub fn default_template_source(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Direct => DIRECT_TEMPLATE,
        StrategyKind::CoT => COT_TEMPLATE,
        StrategyKind::ReAct => REACT_TEMPLATE,
        StrategyKind::Debate => DEBATE_TEMPLATE,
    }
}

/// Parsed built-in template for a strategy.
pub fn default_template(kind: StrategyKind) -> PromptTemplate {
    PromptTemplate::new(default_template_source(kind))
}

/// Proponent, Skeptic and Judge.
pub fn default_roles() -> Vec<DebateRole> {
    vec![
        DebateRole::new(
            "Proponent",
            "Lay out a systematic approach to the problem, derive a solution, and arrive at an answer.",
        ),
        DebateRole::new(
            "Skeptic",
            "Scrutinize the reasoning so far, look for gaps and alternative readings, and arrive at an answer.",
        ),
        DebateRole::new(
            "Judge",
            "Weigh both sides and give a <final_answer> once the debate has enough information.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasonbench_core::{DebateParams, QuestionParams, ReactParams};

    #[test]
    fn test_default_templates_fit_their_params() {
        assert!(default_template(StrategyKind::Direct).check::<QuestionParams>().is_ok());
        assert!(default_template(StrategyKind::CoT).check::<QuestionParams>().is_ok());
        assert!(default_template(StrategyKind::ReAct).check::<ReactParams>().is_ok());
        assert!(default_template(StrategyKind::Debate).check::<DebateParams>().is_ok());
    }

    #[test]
    fn test_default_templates_reference_question() {
        for kind in StrategyKind::ALL {
            assert!(default_template(kind).references("question"), "{:?}", kind);
        }
    }

    #[test]
    fn test_react_template_leaves_history_to_scaffold() {
        assert!(!default_template(StrategyKind::ReAct).references("history"));
        assert!(REACT_CONTINUATION.contains("<observation>"));
    }

    #[test]
    fn test_default_roles_end_with_judge() {
        let roles = default_roles();
        assert_eq!(roles.len(), 3);
        assert!(roles[2].is_judge());
        assert!(!roles[0].is_judge());
        assert!(roles[2].goal.contains("<final_answer>"));
    }
}
