//! Deep research pipeline.
//!
//! Runs a query through up to four sequential model calls:
//! 1. **Triage**: decide whether the query needs clarification
//! 2. **Clarify**: generate questions and collect the user's answers
//! 3. **Instruct**: rewrite the query as detailed research instructions (four-stage only)
//! 4. **Research**: produce the report with web search enabled
//!
//! Citations are recovered from the research reply afterwards and the report
//! may be written to disk on request.

pub mod clarify;
pub mod engine;
pub mod output;
pub mod schemas;
pub mod session;
pub mod sources;
pub mod stages;

pub use clarify::{Clarification, augment_query};
pub use engine::{PipelineCallback, RecordingCallback, ResearchPipeline};
pub use output::{ReportWriter, ResearchResult, render_sources};
pub use schemas::{ClarifyResult, InstructionResult, ResponseSchema, TriageResult};
pub use session::{PipelineSession, ShellState};
pub use sources::{Citation, CitationSource, extract_citations};
pub use stages::Stage;
