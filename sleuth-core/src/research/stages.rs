//! The closed set of pipeline stages and the request each one sends.

use super::schemas::{ClarifyResult, ResponseSchema, TriageResult};
use super::session::ShellState;
use crate::config::{PipelineConfig, StageConfig};
use crate::types::{ModelRequest, ToolSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One remote model invocation in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Triage,
    Clarify,
    Instruct,
    Research,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Triage => "triage",
            Stage::Clarify => "clarify",
            Stage::Instruct => "instruct",
            Stage::Research => "research",
        }
    }

    /// Shell state while this stage runs.
    pub fn state(self) -> ShellState {
        match self {
            Stage::Triage => ShellState::Triaging,
            Stage::Clarify => ShellState::Clarifying,
            Stage::Instruct => ShellState::Instructing,
            Stage::Research => ShellState::Researching,
        }
    }

    pub fn config(self, pipeline: &PipelineConfig) -> &StageConfig {
        match self {
            Stage::Triage => &pipeline.triage,
            Stage::Clarify => &pipeline.clarify,
            Stage::Instruct => &pipeline.instruct,
            Stage::Research => &pipeline.research,
        }
    }

    /// Build the request this stage sends for `input`.
    ///
    /// Triage and clarify ask for strict JSON; only research may search the web.
    pub fn request(self, pipeline: &PipelineConfig, input: &str) -> ModelRequest {
        let cfg = self.config(pipeline);
        let request = ModelRequest::text(&cfg.model, &cfg.instructions, input);
        match self {
            Stage::Triage => request.with_schema(TriageResult::NAME, TriageResult::json_schema()),
            Stage::Clarify => {
                request.with_schema(ClarifyResult::NAME, ClarifyResult::json_schema())
            }
            Stage::Instruct => request,
            Stage::Research => request.with_tool(ToolSpec::WebSearchPreview),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
