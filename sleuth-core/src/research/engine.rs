//! Research pipeline engine.
//!
//! Drives one `PipelineSession` through the stages selected by the pipeline
//! variant. Each stage is a single awaited model call whose reply is
//! validated before anything downstream sees it; the first failure ends the
//! run.

use super::clarify::Clarification;
use super::output::{ReportWriter, ResearchResult};
use super::schemas::{
    ClarifyResult, InstructionResult, TriageResult, parse_structured, require_text,
};
use super::session::{PipelineSession, ShellState};
use super::sources::CitationSource;
use super::stages::Stage;
use crate::client::ModelClient;
use crate::config::{PipelineConfig, PipelineVariant};
use crate::error::Result;
use crate::types::{ModelResponse, TokenUsage};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hooks the engine uses to talk to whoever is driving it.
#[async_trait]
pub trait PipelineCallback: Send + Sync {
    /// A stage is about to send its request.
    async fn on_stage_start(&self, stage: Stage);

    /// A stage's reply arrived and passed validation.
    async fn on_stage_complete(&self, stage: Stage, usage: &TokenUsage);

    /// Ask the user clarifying question `index` (1-based) of `total`.
    ///
    /// `Ok(None)` means input ended; it counts as no answer, as does an empty
    /// string. A read failure ends the run.
    async fn ask_clarification(
        &self,
        index: usize,
        total: usize,
        question: &str,
    ) -> std::io::Result<Option<String>>;

    /// The research call is in flight. Default is a no-op.
    async fn on_research_start(&self) {}

    /// The research call returned, successfully or not. Default is a no-op.
    async fn on_research_end(&self) {}

    /// The session entered `state`. Default is a no-op.
    async fn on_state_change(&self, _state: ShellState) {}
}

/// Sequences the stage calls for one run.
pub struct ResearchPipeline {
    config: PipelineConfig,
    client: Arc<dyn ModelClient>,
    callback: Arc<dyn PipelineCallback>,
}

impl ResearchPipeline {
    pub fn new(
        config: PipelineConfig,
        client: Arc<dyn ModelClient>,
        callback: Arc<dyn PipelineCallback>,
    ) -> Self {
        Self {
            config,
            client,
            callback,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run from `Start` to `Presenting`.
    ///
    /// On success `session.result` holds the report and its citations. On
    /// failure the session is left in `Error` with the message recorded.
    pub async fn run(&self, session: &mut PipelineSession) -> Result<()> {
        info!(
            variant = %self.config.variant,
            provider = self.client.provider_name(),
            "Starting research pipeline"
        );
        match self.drive(session).await {
            Ok(()) => {
                info!(
                    input_tokens = session.usage.input_tokens,
                    output_tokens = session.usage.output_tokens,
                    elapsed_ms = session.elapsed().num_milliseconds(),
                    "Research pipeline finished"
                );
                Ok(())
            }
            Err(e) => {
                warn!(state = %session.state, error = %e, "Research pipeline failed");
                session.fail(e.to_string());
                self.callback.on_state_change(ShellState::Error).await;
                Err(e)
            }
        }
    }

    async fn drive(&self, session: &mut PipelineSession) -> Result<()> {
        self.enter(session, Stage::Triage.state()).await?;
        let query = session.original_query.clone();
        let reply = self.call(Stage::Triage, session, &query).await?;
        let triage: TriageResult = parse_structured(&reply)?;
        debug!(needs_clarification = triage.needs_clarification, "Triage decided");

        if triage.needs_clarification {
            self.clarify(session).await?;
        }

        if self.config.variant == PipelineVariant::FourStage {
            self.enter(session, Stage::Instruct.state()).await?;
            let input = session.query.clone();
            let reply = self.call(Stage::Instruct, session, &input).await?;
            session.instructions = Some(InstructionResult {
                instructions: require_text(Stage::Instruct.name(), &reply)?,
            });
        }

        self.research(session).await?;
        self.enter(session, ShellState::Presenting).await
    }

    async fn clarify(&self, session: &mut PipelineSession) -> Result<()> {
        self.enter(session, Stage::Clarify.state()).await?;
        let query = session.original_query.clone();
        let reply = self.call(Stage::Clarify, session, &query).await?;
        let questions = parse_structured::<ClarifyResult>(&reply)?.askable();

        let total = questions.len();
        let mut clarifications = Vec::with_capacity(total);
        for (i, question) in questions.into_iter().enumerate() {
            let answer = self
                .callback
                .ask_clarification(i + 1, total, &question)
                .await?
                .unwrap_or_default();
            clarifications.push(Clarification::new(question, answer));
        }
        debug!(
            questions = total,
            answered = clarifications.iter().filter(|c| !c.is_blank()).count(),
            "Clarification collected"
        );
        session.apply_clarifications(clarifications);
        Ok(())
    }

    async fn research(&self, session: &mut PipelineSession) -> Result<()> {
        self.enter(session, Stage::Research.state()).await?;
        let input = session.research_input().to_string();

        self.callback.on_research_start().await;
        let outcome = self.call(Stage::Research, session, &input).await;
        self.callback.on_research_end().await;
        let reply = outcome?;

        // Emptiness is judged on trimmed text; the report itself is kept verbatim.
        require_text(Stage::Research.name(), &reply)?;
        let source = CitationSource::resolve(&reply.raw);
        info!(
            shape = source.shape(),
            citations = source.citations().len(),
            "Citations extracted"
        );
        session.result = Some(ResearchResult {
            report: reply.output_text,
            citations: source.into_citations(),
            model: reply.model,
            usage: reply.usage,
        });
        Ok(())
    }

    /// Send one stage request and account for its usage.
    ///
    /// Validation of the reply is left to the caller.
    async fn call(
        &self,
        stage: Stage,
        session: &mut PipelineSession,
        input: &str,
    ) -> Result<ModelResponse> {
        let request = stage.request(&self.config, input);
        self.callback.on_stage_start(stage).await;
        debug!(
            stage = stage.name(),
            model = %request.model,
            input_len = input.len(),
            tools = request.tools.len(),
            "Sending stage request"
        );

        let reply = self.client.respond(request).await?;
        session.record_usage(&reply.usage);
        info!(
            stage = stage.name(),
            model = %reply.model,
            input_tokens = reply.usage.input_tokens,
            output_tokens = reply.usage.output_tokens,
            "Stage complete"
        );
        self.callback.on_stage_complete(stage, &reply.usage).await;
        Ok(reply)
    }

    async fn enter(&self, session: &mut PipelineSession, state: ShellState) -> Result<()> {
        session.transition(state)?;
        self.callback.on_state_change(state).await;
        Ok(())
    }

    /// Persist the presented report and end the session.
    pub async fn save_report(
        &self,
        session: &mut PipelineSession,
        writer: &ReportWriter,
    ) -> Result<PathBuf> {
        self.enter(session, ShellState::Saving).await?;
        let saved: Result<PathBuf> = session
            .result()
            .map_err(Into::into)
            .and_then(|result| writer.save(&result.report).map_err(Into::into));
        match saved {
            Ok(path) => {
                self.enter(session, ShellState::End).await?;
                Ok(path)
            }
            Err(e) => {
                session.fail(e.to_string());
                self.callback.on_state_change(ShellState::Error).await;
                Err(e)
            }
        }
    }

    /// End the session without saving.
    pub async fn finish(&self, session: &mut PipelineSession) -> Result<()> {
        self.enter(session, ShellState::End).await
    }
}

/// A callback that answers clarification prompts from a script and records
/// everything it sees.
pub struct RecordingCallback {
    answers: tokio::sync::Mutex<std::collections::VecDeque<String>>,
    stages: tokio::sync::Mutex<Vec<Stage>>,
    questions: tokio::sync::Mutex<Vec<(usize, usize, String)>>,
    states: tokio::sync::Mutex<Vec<ShellState>>,
    research_events: tokio::sync::Mutex<Vec<&'static str>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::with_answers(Vec::<String>::new())
    }

    /// Answers are handed out in order; once exhausted input reads as closed.
    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: tokio::sync::Mutex::new(answers.into_iter().map(Into::into).collect()),
            stages: tokio::sync::Mutex::new(Vec::new()),
            questions: tokio::sync::Mutex::new(Vec::new()),
            states: tokio::sync::Mutex::new(Vec::new()),
            research_events: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn stages(&self) -> Vec<Stage> {
        self.stages.lock().await.clone()
    }

    /// `(index, total, question)` for every prompt issued.
    pub async fn questions(&self) -> Vec<(usize, usize, String)> {
        self.questions.lock().await.clone()
    }

    pub async fn states(&self) -> Vec<ShellState> {
        self.states.lock().await.clone()
    }

    pub async fn research_events(&self) -> Vec<&'static str> {
        self.research_events.lock().await.clone()
    }
}

impl Default for RecordingCallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineCallback for RecordingCallback {
    async fn on_stage_start(&self, stage: Stage) {
        self.stages.lock().await.push(stage);
    }

    async fn on_stage_complete(&self, _stage: Stage, _usage: &TokenUsage) {}

    async fn ask_clarification(
        &self,
        index: usize,
        total: usize,
        question: &str,
    ) -> std::io::Result<Option<String>> {
        self.questions
            .lock()
            .await
            .push((index, total, question.to_string()));
        Ok(self.answers.lock().await.pop_front())
    }

    async fn on_research_start(&self) {
        self.research_events.lock().await.push("start");
    }

    async fn on_research_end(&self) {
        self.research_events.lock().await.push("end");
    }

    async fn on_state_change(&self, state: ShellState) {
        self.states.lock().await.push(state);
    }
}
