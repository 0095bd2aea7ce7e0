//! Pipeline session state machine.
//!
//! Tracks where a single run is in the Triage → Clarify → Instruct →
//! Research → Present → Save sequence and refuses moves the sequence does
//! not allow.

use super::clarify::{Clarification, augment_query};
use super::output::ResearchResult;
use super::schemas::InstructionResult;
use crate::error::AgentError;
use crate::types::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of the interactive shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellState {
    Start,
    Triaging,
    Clarifying,
    Instructing,
    Researching,
    Presenting,
    Saving,
    End,
    Error,
}

impl ShellState {
    /// Whether `next` directly follows `self`.
    ///
    /// There is no branching back. Any non-terminal state may fail into `Error`.
    pub fn can_transition_to(self, next: ShellState) -> bool {
        use ShellState::*;
        if next == Error {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Start, Triaging)
                | (Triaging, Clarifying | Instructing | Researching)
                | (Clarifying, Instructing | Researching)
                | (Instructing, Researching)
                | (Researching, Presenting)
                | (Presenting, Saving | End)
                | (Saving, End)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ShellState::End | ShellState::Error)
    }
}

impl fmt::Display for ShellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShellState::Start => "start",
            ShellState::Triaging => "triaging",
            ShellState::Clarifying => "clarifying",
            ShellState::Instructing => "instructing",
            ShellState::Researching => "researching",
            ShellState::Presenting => "presenting",
            ShellState::Saving => "saving",
            ShellState::End => "end",
            ShellState::Error => "error",
        };
        f.write_str(name)
    }
}

/// One run of the pipeline, from the raw query to the (optionally saved) report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSession {
    /// The query as the user typed it.
    pub original_query: String,
    /// The query after clarification answers were appended.
    pub query: String,
    pub state: ShellState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Usage summed over every model call in this run.
    pub usage: TokenUsage,
    pub clarifications: Vec<Clarification>,
    /// Elaborated instructions (four-stage runs only).
    pub instructions: Option<InstructionResult>,
    pub result: Option<ResearchResult>,
    pub error: Option<String>,
}

impl PipelineSession {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let now = Utc::now();
        Self {
            original_query: query.clone(),
            query,
            state: ShellState::Start,
            started_at: now,
            updated_at: now,
            usage: TokenUsage::default(),
            clarifications: Vec::new(),
            instructions: None,
            result: None,
            error: None,
        }
    }

    /// Move to `next`, or fail if the move skips or reverses a step.
    pub fn transition(&mut self, next: ShellState) -> Result<(), AgentError> {
        if !self.state.can_transition_to(next) {
            return Err(AgentError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the session as failed.
    ///
    /// A session already at a terminal state keeps that state and only
    /// records the message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        if !self.state.is_terminal() {
            self.state = ShellState::Error;
        }
        self.updated_at = Utc::now();
    }

    /// Record the user's answers and rebuild the working query from them.
    pub fn apply_clarifications(&mut self, clarifications: Vec<Clarification>) {
        self.query = augment_query(&self.original_query, &clarifications);
        self.clarifications = clarifications;
        self.updated_at = Utc::now();
    }

    /// Text handed to the research stage.
    pub fn research_input(&self) -> &str {
        self.instructions
            .as_ref()
            .map_or(&self.query, |i| &i.instructions)
    }

    pub fn record_usage(&mut self, usage: &TokenUsage) {
        self.usage.accumulate(usage);
    }

    pub fn result(&self) -> Result<&ResearchResult, AgentError> {
        self.result.as_ref().ok_or(AgentError::NoResult)
    }

    /// Wall-clock time since the run started.
    pub fn elapsed(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }
}
