//! Prompt templates with named `{placeholder}` fields.
//!
//! Each strategy renders its template from a typed parameter struct. A
//! placeholder the struct cannot fill is an error, never blank text.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

lazy_static! {
    /// Escaped braces (`{{`, `}}`) or a `{name}` placeholder.
    static ref PLACEHOLDER_PATTERN: Regex =
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

/// Errors from loading or rendering templates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template placeholder '{{{field}}}' is not provided by {params}")]
    MissingField { field: String, params: &'static str },

    #[error("Template must contain the '{{{0}}}' placeholder")]
    MissingPlaceholder(String),

    #[error("Failed to read template file {path}: {message}")]
    Io { path: String, message: String },
}

/// Values a template can be rendered with.
pub trait TemplateParams {
    /// Name used in error messages.
    const NAME: &'static str;

    /// Every field this struct can fill.
    const FIELDS: &'static [&'static str];

    /// Value for a field, or `None` if the struct has no such field.
    fn field(&self, name: &str) -> Option<&str>;
}

/// Parameters for single-question templates (Direct, CoT).
#[derive(Debug, Clone, Copy)]
pub struct QuestionParams<'a> {
    pub question: &'a str,
}

impl TemplateParams for QuestionParams<'_> {
    const NAME: &'static str = "question templates";
    const FIELDS: &'static [&'static str] = &["question"];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "question" => Some(self.question),
            _ => None,
        }
    }
}

/// Parameters for ReAct templates.
#[derive(Debug, Clone, Copy)]
pub struct ReactParams<'a> {
    pub question: &'a str,
    pub history: &'a str,
}

impl TemplateParams for ReactParams<'_> {
    const NAME: &'static str = "ReAct templates";
    const FIELDS: &'static [&'static str] = &["question", "history"];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "question" => Some(self.question),
            "history" => Some(self.history),
            _ => None,
        }
    }
}

/// Parameters for debate templates.
#[derive(Debug, Clone, Copy)]
pub struct DebateParams<'a> {
    pub role_name: &'a str,
    pub role_goal: &'a str,
    pub debate_history: &'a str,
    pub question: &'a str,
}

impl TemplateParams for DebateParams<'_> {
    const NAME: &'static str = "debate templates";
    const FIELDS: &'static [&'static str] = &["role_name", "role_goal", "debate_history", "question"];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "role_name" => Some(self.role_name),
            "role_goal" => Some(self.role_goal),
            "debate_history" => Some(self.debate_history),
            "question" => Some(self.question),
            _ => None,
        }
    }
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    source: String,
    placeholders: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template from text.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER_PATTERN.captures_iter(&source) {
            if let Some(name) = caps.get(1) {
                if !placeholders.iter().any(|p| p == name.as_str()) {
                    placeholders.push(name.as_str().to_string());
                }
            }
        }
        Self {
            source,
            placeholders,
        }
    }

    /// Load a template from a text file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(contents))
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Whether the template uses `{field}`.
    pub fn references(&self, field: &str) -> bool {
        self.placeholders.iter().any(|p| p == field)
    }

    /// Fail unless the template uses `{field}`.
    pub fn require(&self, field: &str) -> Result<(), TemplateError> {
        if self.references(field) {
            Ok(())
        } else {
            Err(TemplateError::MissingPlaceholder(field.to_string()))
        }
    }

    /// Check that `P` can fill every placeholder, without rendering.
    pub fn check<P: TemplateParams>(&self) -> Result<(), TemplateError> {
        match self
            .placeholders
            .iter()
            .find(|p| !P::FIELDS.contains(&p.as_str()))
        {
            Some(field) => Err(TemplateError::MissingField {
                field: field.clone(),
                params: P::NAME,
            }),
            None => Ok(()),
        }
    }

    /// Substitute every placeholder from `params`.
    pub fn render<P: TemplateParams>(&self, params: &P) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in PLACEHOLDER_PATTERN.captures_iter(&self.source) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&self.source[last..whole.start()]);

            match caps.get(1) {
                Some(name) => {
                    let value = params.field(name.as_str()).ok_or_else(|| TemplateError::MissingField {
                        field: name.as_str().to_string(),
                        params: P::NAME,
                    })?;
                    out.push_str(value);
                }
                None if whole.as_str() == "{{" => out.push('{'),
                None => out.push('}'),
            }

            last = whole.end();
        }

        out.push_str(&self.source[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_question() {
        let template = PromptTemplate::new("Q: {question}\nAnswer:");
        let prompt = template
            .render(&QuestionParams { question: "2+2?" })
            .unwrap();
        assert_eq!(prompt, "Q: 2+2?\nAnswer:");
    }

    #[test]
    fn test_render_repeated_and_escaped() {
        let template = PromptTemplate::new("{{json}} {question} / {question} }}");
        let prompt = template.render(&QuestionParams { question: "x" }).unwrap();
        assert_eq!(prompt, "{json} x / x }");
        assert_eq!(template.placeholders(), ["question"]);
    }

    #[test]
    fn test_unknown_field_fails() {
        let template = PromptTemplate::new("{question} as {role_name}");
        let err = template
            .render(&QuestionParams { question: "x" })
            .unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingField {
                field: "role_name".to_string(),
                params: "question templates",
            }
        );
        assert!(template.check::<QuestionParams>().is_err());
        assert!(template.check::<DebateParams>().is_ok());
    }

    #[test]
    fn test_require_placeholder() {
        let template = PromptTemplate::new("no fields at all");
        assert!(matches!(
            template.require("question"),
            Err(TemplateError::MissingPlaceholder(_))
        ));
    }

    #[test]
    fn test_debate_params() {
        let template = PromptTemplate::new("[{role_name}] {role_goal}\n{debate_history}\n{question}");
        let prompt = template
            .render(&DebateParams {
                role_name: "Judge",
                role_goal: "decide",
                debate_history: "none",
                question: "Q",
            })
            .unwrap();
        assert_eq!(prompt, "[Judge] decide\nnone\nQ");
    }

    #[test]
    fn test_react_params_reference_history() {
        let template = PromptTemplate::new("{question}\n{history}");
        assert!(template.references("history"));
        assert!(template.check::<ReactParams>().is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        let err = PromptTemplate::from_file("/definitely/not/here.txt").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
