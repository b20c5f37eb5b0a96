//! Answer extraction from free-form model output.
//!
//! Model text is adversarial: option letters show up inside explanations,
//! answers get wrapped in tags, and trailing whitespace is everywhere. The
//! extractor only trusts a label that stands alone on one of the final lines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many trailing lines are searched for a standalone label.
pub const TAIL_WINDOW: usize = 5;

/// Tag carrying an explicit verdict in ReAct and debate output.
pub const FINAL_ANSWER_TAG: &str = "final_answer";

/// Closed set of single-character answer labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabelSet {
    labels: Vec<char>,
}

impl LabelSet {
    /// Build a label set from characters. Whitespace and duplicates are dropped.
    pub fn new(labels: impl IntoIterator<Item = char>) -> Self {
        let mut out: Vec<char> = Vec::new();
        for c in labels {
            if !c.is_whitespace() && !out.contains(&c) {
                out.push(c);
            }
        }
        Self { labels: out }
    }

    /// Parse a label set written as a string such as `"ABCD"`.
    pub fn parse(spec: &str) -> Option<Self> {
        let set = Self::new(spec.chars());
        if set.labels.is_empty() {
            None
        } else {
            Some(set)
        }
    }

    /// Whether `c` is a valid label.
    pub fn contains(&self, c: char) -> bool {
        self.labels.contains(&c)
    }

    /// Returns the label when `s` is exactly one valid label and nothing else.
    fn exact(&self, s: &str) -> Option<char> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if self.contains(c) => Some(c),
            _ => None,
        }
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(['A', 'B', 'C', 'D'])
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.labels {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for LabelSet {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LabelSet::parse(&value).ok_or_else(|| "label set must contain at least one label".to_string())
    }
}

impl From<LabelSet> for String {
    fn from(value: LabelSet) -> Self {
        value.to_string()
    }
}

/// Extracts a single choice label from model output.
#[derive(Debug, Clone, Default)]
pub struct AnswerExtractor {
    labels: LabelSet,
}

impl AnswerExtractor {
    /// Create an extractor for a label set.
    pub fn new(labels: LabelSet) -> Self {
        Self { labels }
    }

    /// The labels this extractor accepts.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Extract a label from `text`, or return an empty string.
    ///
    /// Priority:
    /// 1. the last non-empty line, if it is exactly a label
    /// 2. scanning the last [`TAIL_WINDOW`] lines from the bottom, the first
    ///    line that is exactly a label
    /// 3. within the same window, a line that is one label surrounded only by
    ///    whitespace
    ///
    /// Labels embedded in prose (`"the answer is B"`) are never matched.
    pub fn extract(&self, text: &str) -> String {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let Some(last) = lines.last() else {
            return String::new();
        };

        if let Some(label) = self.labels.exact(last) {
            return label.to_string();
        }

        let tail = &lines[lines.len().saturating_sub(TAIL_WINDOW)..];

        if let Some(label) = tail.iter().rev().find_map(|line| self.labels.exact(line)) {
            return label.to_string();
        }

        // Anchored "whitespace, one label, whitespace" match, top of the window first.
        tail.iter()
            .find_map(|line| self.labels.exact(line.trim()))
            .map(|label| label.to_string())
            .unwrap_or_default()
    }

    /// Content of a non-empty `<final_answer>` tag, reduced to a label when
    /// one can be extracted from it.
    pub fn tagged_final_answer(&self, text: &str) -> Option<String> {
        let inner = extract_tag(text, FINAL_ANSWER_TAG)?;
        if inner.is_empty() {
            return None;
        }
        let label = self.extract(&inner);
        Some(if label.is_empty() { inner } else { label })
    }

    /// `<final_answer>` tag first, then the plain label rules on the whole text.
    pub fn final_answer(&self, text: &str) -> String {
        self.tagged_final_answer(text)
            .unwrap_or_else(|| self.extract(text))
    }
}

/// Extract a label using the default `A`-`D` label set.
pub fn extract_choice(text: &str) -> String {
    AnswerExtractor::default().extract(text)
}

/// Trimmed content of the first `<tag>...</tag>` pair, matched without
/// regard to ASCII case and across lines.
pub fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = find_ignore_ascii_case(text, &open, 0)? + open.len();
    let end = find_ignore_ascii_case(text, &close, start)?;

    Some(text[start..end].trim().to_string())
}

// Both needles start with '<', so every hit lands on a char boundary.
fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();

    if pat.is_empty() || from > hay.len() || hay.len() - from < pat.len() {
        return None;
    }

    (from..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}
