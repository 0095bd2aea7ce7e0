//! Fixed-shape records each stage expects back from the model.
//!
//! Structured stages ask for strict JSON and are deserialized with
//! `deny_unknown_fields`, so a reply that drifts from the schema fails here
//! instead of leaking into the next stage.

use crate::error::ValidationError;
use crate::types::ModelResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A record the model must produce as strict JSON.
pub trait ResponseSchema: DeserializeOwned {
    /// Schema name sent with the request and used in error messages.
    const NAME: &'static str;

    /// JSON schema document for the record.
    fn json_schema() -> Value;
}

/// Whether a query needs clarification before research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriageResult {
    pub needs_clarification: bool,
}

impl ResponseSchema for TriageResult {
    const NAME: &'static str = "triage_response";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "needs_clarification": { "type": "boolean" }
            },
            "required": ["needs_clarification"],
            "additionalProperties": false
        })
    }
}

/// Questions to put to the user, in the order they should be asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClarifyResult {
    pub questions: Vec<String>,
}

impl ClarifyResult {
    /// Questions with surrounding whitespace removed and blanks dropped.
    pub fn askable(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ResponseSchema for ClarifyResult {
    const NAME: &'static str = "clarify_response";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["questions"],
            "additionalProperties": false
        })
    }
}

/// Elaborated research directive produced by the instruction stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionResult {
    pub instructions: String,
}

/// Deserialize a structured reply into `T`.
///
/// Tolerates a markdown code fence around the JSON; anything else that does
/// not deserialize cleanly is a `SchemaMismatch`.
pub fn parse_structured<T: ResponseSchema>(response: &ModelResponse) -> Result<T, ValidationError> {
    let text = strip_code_fence(response.output_text.trim());
    if text.is_empty() {
        return Err(ValidationError::SchemaMismatch {
            schema: T::NAME.to_string(),
            message: "empty response".to_string(),
        });
    }
    serde_json::from_str(text).map_err(|e| ValidationError::SchemaMismatch {
        schema: T::NAME.to_string(),
        message: e.to_string(),
    })
}

/// Require non-blank free text from `stage`.
pub fn require_text(stage: &str, response: &ModelResponse) -> Result<String, ValidationError> {
    let text = response.output_text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyOutput {
            stage: stage.to_string(),
        });
    }
    Ok(text.to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> ModelResponse {
        ModelResponse::from_text("mock-model", text)
    }

    #[test]
    fn test_parse_triage() {
        let result: TriageResult =
            parse_structured(&reply(r#"{"needs_clarification": true}"#)).unwrap();
        assert!(result.needs_clarification);
    }

    #[test]
    fn test_parse_triage_wrong_type() {
        let err = parse_structured::<TriageResult>(&reply(r#"{"needs_clarification": "yes"}"#))
            .unwrap_err();
        match err {
            ValidationError::SchemaMismatch { schema, .. } => {
                assert_eq!(schema, "triage_response")
            }
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let result = parse_structured::<TriageResult>(&reply(
            r#"{"needs_clarification": false, "reason": "clear"}"#,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let result = parse_structured::<ClarifyResult>(&reply("{}"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let result = parse_structured::<ClarifyResult>(&reply("Here are some questions: ..."));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_empty_is_mismatch() {
        let err = parse_structured::<TriageResult>(&reply("   ")).unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let result: ClarifyResult = parse_structured(&reply(
            "```json\n{\"questions\": [\"What region?\"]}\n```",
        ))
        .unwrap();
        assert_eq!(result.questions, vec!["What region?".to_string()]);
    }

    #[test]
    fn test_parse_empty_question_list() {
        let result: ClarifyResult = parse_structured(&reply(r#"{"questions": []}"#)).unwrap();
        assert!(result.questions.is_empty());
        assert!(result.askable().is_empty());
    }

    #[test]
    fn test_askable_drops_blank_questions() {
        let result = ClarifyResult {
            questions: vec![
                "  Which market?  ".to_string(),
                "".to_string(),
                "   ".to_string(),
                "What timeframe?".to_string(),
            ],
        };
        assert_eq!(result.askable(), vec!["Which market?", "What timeframe?"]);
    }

    #[test]
    fn test_require_text() {
        assert_eq!(
            require_text("instruct", &reply("  Focus on 2024.  ")).unwrap(),
            "Focus on 2024."
        );
        let err = require_text("research", &reply("\n")).unwrap_err();
        assert_eq!(err.to_string(), "research stage returned no text");
    }

    #[test]
    fn test_schemas_are_strict_objects() {
        for schema in [TriageResult::json_schema(), ClarifyResult::json_schema()] {
            assert_eq!(schema["type"], "object");
            assert_eq!(schema["additionalProperties"], false);
        }
    }
}
