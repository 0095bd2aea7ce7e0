//! Clarification answers and query augmentation.

use serde::{Deserialize, Serialize};

/// Placeholder recorded for a question the user left blank.
pub const NO_ANSWER: &str = "(no additional input)";

/// One clarifying question and the user's answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub answer: String,
}

impl Clarification {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into().trim().to_string(),
        }
    }

    /// Whether the user gave no answer.
    pub fn is_blank(&self) -> bool {
        self.answer.is_empty()
    }
}

/// Append clarification pairs to `query`, in order.
///
/// With no pairs the query comes back unchanged. Every pair is kept, blank
/// answers included, so the output depends only on the inputs.
pub fn augment_query(query: &str, clarifications: &[Clarification]) -> String {
    if clarifications.is_empty() {
        return query.to_string();
    }

    let mut out = String::with_capacity(query.len() + 64 * clarifications.len());
    out.push_str(query);
    out.push_str("\n\nContext:");
    for c in clarifications {
        let answer = if c.is_blank() { NO_ANSWER } else { &c.answer };
        out.push('\n');
        out.push_str(&c.question);
        out.push_str(": ");
        out.push_str(answer);
    }
    out
}
