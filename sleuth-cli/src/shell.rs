//! Interactive research shell.
//!
//! Reads the query, runs the pipeline with console hooks, presents the report
//! with its sources, and asks whether to save it.

use crate::markdown::render_report;
use crate::spinner::Spinner;
use async_trait::async_trait;
use sleuth_core::client::ModelClient;
use sleuth_core::config::SleuthConfig;
use sleuth_core::error::{AbortError, Result, SleuthError};
use sleuth_core::research::{
    PipelineCallback, PipelineSession, ReportWriter, ResearchPipeline, Stage, render_sources,
};
use sleuth_core::types::TokenUsage;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// How a shell run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    /// The user entered nothing at the query prompt.
    EmptyQuery,
    /// The report was written to this path.
    Saved(PathBuf),
    /// The user declined to save.
    Declined,
}

/// Whether a save-prompt answer is affirmative. Only `y` and `yes` count.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompted line input shared by the shell and its callback.
pub struct LineReader<R> {
    inner: tokio::sync::Mutex<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(inner),
        }
    }

    /// Print `prompt` and read one line. `None` means input is closed.
    pub async fn prompt(&self, prompt: &str) -> std::io::Result<Option<String>> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        let read = self.inner.lock().await.read_line(&mut line).await?;
        if read == 0 {
            println!();
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Console hooks for the pipeline.
pub struct ConsoleCallback<R> {
    input: Arc<LineReader<R>>,
    spinner: tokio::sync::Mutex<Option<Spinner>>,
}

impl<R> ConsoleCallback<R> {
    pub fn new(input: Arc<LineReader<R>>) -> Self {
        Self {
            input,
            spinner: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> PipelineCallback for ConsoleCallback<R> {
    async fn on_stage_start(&self, stage: Stage) {
        let status = match stage {
            Stage::Triage => "Checking whether the query needs clarification...",
            Stage::Clarify => "Preparing clarifying questions...",
            Stage::Instruct => "Writing research instructions...",
            Stage::Research => return,
        };
        println!("\x1b[90m{status}\x1b[0m");
    }

    async fn on_stage_complete(&self, stage: Stage, usage: &TokenUsage) {
        debug!(stage = stage.name(), tokens = usage.total(), "Stage finished");
    }

    async fn ask_clarification(
        &self,
        index: usize,
        total: usize,
        question: &str,
    ) -> std::io::Result<Option<String>> {
        println!("\n\x1b[33mQuestion {index}/{total}:\x1b[0m {question}");
        self.input.prompt("> ").await.inspect_err(|e| {
            warn!(error = %e, "Failed to read clarification answer");
        })
    }

    async fn on_research_start(&self) {
        println!();
        *self.spinner.lock().await = Some(Spinner::start("Researching (this can take several minutes)"));
    }

    async fn on_research_end(&self) {
        if let Some(spinner) = self.spinner.lock().await.take() {
            spinner.stop().await;
        }
    }
}

/// Run one query through the shell.
pub async fn run<R>(
    config: &SleuthConfig,
    client: Arc<dyn ModelClient>,
    input: Arc<LineReader<R>>,
) -> Result<ShellOutcome>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    println!("\x1b[1mSleuth\x1b[0m deep research ({})\n", config.pipeline.variant);

    let query = match input.prompt("Research query: ").await? {
        Some(q) => q.trim().to_string(),
        None => return Err(abort("query")),
    };
    if query.is_empty() {
        println!("No query entered.");
        return Ok(ShellOutcome::EmptyQuery);
    }

    let callback = Arc::new(ConsoleCallback::new(input.clone()));
    let pipeline = ResearchPipeline::new(config.pipeline.clone(), client, callback);
    let mut session = PipelineSession::new(query);
    pipeline.run(&mut session).await?;

    let result = session.result()?;
    let rule = "=".repeat(50);
    println!("\n{rule}\n\x1b[1mRESULTS\x1b[0m\n{rule}");
    println!("{}", render_report(&result.report));
    println!("{rule}\n");
    println!("{}\n", render_sources(&result.citations));

    let answer = match input.prompt("Save to file? (y/N) ").await? {
        Some(answer) => answer,
        None => {
            session.fail("input closed at the save prompt");
            return Err(abort("save"));
        }
    };
    if !is_affirmative(&answer) {
        pipeline.finish(&mut session).await?;
        return Ok(ShellOutcome::Declined);
    }

    let writer = ReportWriter::new(&config.output.reports_dir);
    let path = pipeline.save_report(&mut session, &writer).await?;
    println!("Report saved to {}", path.display());
    Ok(ShellOutcome::Saved(path))
}

fn abort(prompt: &str) -> SleuthError {
    AbortError::InputClosed {
        prompt: prompt.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sleuth_core::client::MockModelClient;

    fn reader(script: &'static str) -> Arc<LineReader<&'static [u8]>> {
        bytes_reader(script.as_bytes())
    }

    fn bytes_reader(script: &'static [u8]) -> Arc<LineReader<&'static [u8]>> {
        Arc::new(LineReader::new(script))
    }

    fn config_in(dir: &std::path::Path) -> SleuthConfig {
        let mut config = SleuthConfig::default();
        config.output.reports_dir = dir.join("reports");
        config
    }

    #[test]
    fn test_is_affirmative() {
        for yes in ["y", "Y", "yes", " YES "] {
            assert!(is_affirmative(yes), "{yes}");
        }
        for no in ["", "n", "no", "yep", "sure"] {
            assert!(!is_affirmative(no), "{no}");
        }
    }

    #[tokio::test]
    async fn test_prompt_reads_lines_then_eof() {
        let input = reader("first\r\n\nlast");
        assert_eq!(input.prompt("").await.unwrap().as_deref(), Some("first"));
        assert_eq!(input.prompt("").await.unwrap().as_deref(), Some(""));
        assert_eq!(input.prompt("").await.unwrap().as_deref(), Some("last"));
        assert_eq!(input.prompt("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_end_to_end_saves_report() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let client = Arc::new(MockModelClient::new());
        client.queue_json(json!({ "needs_clarification": true }));
        client.queue_json(json!({ "questions": ["What industry focus?"] }));
        client.queue_text("# Report\n\nAgencies lead adoption.");

        let outcome = run(
            &config,
            client.clone(),
            reader("AI trends in advertising\ncreative agencies\ny\n"),
        )
        .await
        .unwrap();

        let path = match outcome {
            ShellOutcome::Saved(path) => path,
            other => panic!("expected a saved report, got {other:?}"),
        };
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "# Report\n\nAgencies lead adoption."
        );
        assert_eq!(
            client.requests()[2].input,
            "AI trends in advertising\n\nContext:\nWhat industry focus?: creative agencies"
        );
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(MockModelClient::new());
        let outcome = run(&config_in(tmp.path()), client.clone(), reader("   \n"))
            .await
            .unwrap();
        assert_eq!(outcome, ShellOutcome::EmptyQuery);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_eof_at_query_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run(&config_in(tmp.path()), Arc::new(MockModelClient::new()), reader(""))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_decline_and_eof_at_save() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        for (script, declined) in [("q\nn\n", true), ("q\n", false)] {
            let client = Arc::new(MockModelClient::new());
            client.queue_json(json!({ "needs_clarification": false }));
            client.queue_text("Report");
            let result = run(&config, client, reader(script)).await;
            if declined {
                assert_eq!(result.unwrap(), ShellOutcome::Declined);
            } else {
                assert!(matches!(result, Err(SleuthError::Aborted(_))));
            }
        }
        assert!(!config.output.reports_dir.exists());
    }

    #[tokio::test]
    async fn test_eof_during_clarification_is_blank_answer() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(MockModelClient::new());
        client.queue_json(json!({ "needs_clarification": true }));
        client.queue_json(json!({ "questions": ["Which region?"] }));
        client.queue_text("Report");

        let err = run(&config_in(tmp.path()), client.clone(), reader("Solar adoption\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, SleuthError::Aborted(_)));
        assert_eq!(
            client.requests()[2].input,
            "Solar adoption\n\nContext:\nWhich region?: (no additional input)"
        );
    }

    #[tokio::test]
    async fn test_unreadable_clarification_aborts_run() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let client = Arc::new(MockModelClient::new());
        client.queue_json(json!({ "needs_clarification": true }));
        client.queue_json(json!({ "questions": ["Which region?"] }));
        client.queue_text("Report");

        let err = run(&config, client.clone(), bytes_reader(b"Solar\n\xff\xfe bad\ny\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, SleuthError::Io(_)));
        assert_ne!(err.exit_code(), 0);
        assert_eq!(client.call_count(), 2);
        assert!(!config.output.reports_dir.exists());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(MockModelClient::new());
        client.queue_error(sleuth_core::error::LlmError::Connection {
            message: "refused".into(),
        });
        let err = run(&config_in(tmp.path()), client, reader("q\n"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
