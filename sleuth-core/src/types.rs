//! Core type definitions for talking to the model service.
//!
//! A `ModelRequest` carries everything one stage needs to ask of the remote
//! model; a `ModelResponse` carries the extracted text alongside the raw body
//! so later passes (citation extraction) can inspect fields the text drops.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected shape of the model's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text (markdown allowed).
    Text,
    /// Strict JSON matching the given schema document.
    JsonSchema { name: String, schema: Value },
}

/// Hosted tools the model may call during a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSpec {
    WebSearchPreview,
}

impl ToolSpec {
    /// Wire name of the tool type.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ToolSpec::WebSearchPreview => "web_search_preview",
        }
    }
}

/// A single request to the model service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
    pub instructions: String,
    pub input: String,
    pub response_format: ResponseFormat,
    pub tools: Vec<ToolSpec>,
}

impl ModelRequest {
    /// A free-text request with no tools.
    pub fn text(
        model: impl Into<String>,
        instructions: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            instructions: instructions.into(),
            input: input.into(),
            response_format: ResponseFormat::Text,
            tools: Vec::new(),
        }
    }

    /// Request a structured reply matching `schema`.
    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.response_format = ResponseFormat::JsonSchema {
            name: name.into(),
            schema,
        };
        self
    }

    /// Allow the model to call `tool`.
    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }
}

/// Token usage statistics from a model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// A transport-level successful reply.
///
/// Nothing here is validated against a stage schema yet; see
/// [`crate::research::schemas::parse_structured`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub model: String,
    pub output_text: String,
    /// The full response body as returned by the service.
    pub raw: Value,
    pub usage: TokenUsage,
}

impl ModelResponse {
    /// Build a response whose raw body is just the text wrapped in a message item.
    pub fn from_text(model: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let raw = serde_json::json!({
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_text", "text": text, "annotations": [] }]
            }]
        });
        Self {
            id: String::new(),
            model: model.into(),
            output_text: text,
            raw,
            usage: TokenUsage::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_request_defaults() {
        let req = ModelRequest::text("gpt-4o-mini", "Be brief.", "hello");
        assert_eq!(req.response_format, ResponseFormat::Text);
        assert!(req.tools.is_empty());
    }

    #[test]
    fn test_with_tool_is_idempotent() {
        let req = ModelRequest::text("m", "i", "q")
            .with_tool(ToolSpec::WebSearchPreview)
            .with_tool(ToolSpec::WebSearchPreview);
        assert_eq!(req.tools, vec![ToolSpec::WebSearchPreview]);
        assert_eq!(req.tools[0].wire_name(), "web_search_preview");
    }

    #[test]
    fn test_with_schema() {
        let schema = json!({"type": "object"});
        let req = ModelRequest::text("m", "i", "q").with_schema("triage", schema.clone());
        assert_eq!(
            req.response_format,
            ResponseFormat::JsonSchema {
                name: "triage".into(),
                schema
            }
        );
    }

    #[test]
    fn test_token_usage_accumulate() {
        let mut total = TokenUsage::default();
        total.accumulate(&TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        });
        total.accumulate(&TokenUsage {
            input_tokens: 3,
            output_tokens: 2,
        });
        assert_eq!(total.input_tokens, 13);
        assert_eq!(total.total(), 20);
    }

    #[test]
    fn test_from_text_wraps_message_item() {
        let resp = ModelResponse::from_text("mock-model", "report body");
        assert_eq!(resp.output_text, "report body");
        assert_eq!(resp.raw["output"][0]["type"], "message");
        assert_eq!(resp.raw["output"][0]["content"][0]["text"], "report body");
    }
}
