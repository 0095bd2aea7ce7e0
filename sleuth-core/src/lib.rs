//! # Sleuth Core
//!
//! Core library for the Sleuth deep-research shell.
//! Provides the model client, the staged research pipeline, citation
//! extraction, report persistence, configuration, and error types.

pub mod client;
pub mod config;
pub mod error;
pub mod providers;
pub mod research;
pub mod types;

// Re-export commonly used types at the crate root.
pub use client::{MockModelClient, ModelClient};
pub use config::{PipelineConfig, PipelineVariant, SleuthConfig, StageConfig};
pub use error::{Result, SleuthError};
pub use providers::create_client;
pub use research::{
    Citation, PipelineCallback, PipelineSession, ReportWriter, ResearchPipeline, ResearchResult,
    ShellState, Stage,
};
pub use types::{ModelRequest, ModelResponse, TokenUsage};
