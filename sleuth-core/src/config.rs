//! Configuration system for Sleuth.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/sleuth/config.toml` and/or `.sleuth/config.toml`
//! in the working directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a Sleuth run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleuthConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

impl SleuthConfig {
    /// Collect human-readable warnings across all sections.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.llm.validate();
        warnings.extend(self.pipeline.validate());
        if self.output.reports_dir.as_os_str().is_empty() {
            warnings.push("output.reports_dir is empty; reports land in the working directory".into());
        }
        warnings
    }
}

/// Connection settings for the model service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the Responses API.
    pub base_url: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: None,
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            warnings.push(format!(
                "llm.base_url ({}) is not an http(s) URL",
                self.base_url
            ));
        }
        if self.api_key_env.trim().is_empty() {
            warnings.push("llm.api_key_env is empty".to_string());
        }
        if self.timeout_secs == Some(0) {
            warnings.push("llm.timeout_secs is 0; every request will time out".to_string());
        }
        warnings
    }
}

/// Which stages run between triage and research.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    /// Triage -> (Clarify) -> Research.
    #[default]
    ThreeStage,
    /// Triage -> (Clarify) -> Instruct -> Research.
    FourStage,
}

impl std::fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineVariant::ThreeStage => write!(f, "three_stage"),
            PipelineVariant::FourStage => write!(f, "four_stage"),
        }
    }
}

/// Model and instruction text for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageConfig {
    pub model: String,
    pub instructions: String,
}

impl StageConfig {
    fn new(model: &str, instructions: &str) -> Self {
        Self {
            model: model.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

pub const DEFAULT_BASE_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RESEARCH_MODEL: &str = "o3-deep-research-2025-06-26";

/// Immutable per-stage configuration handed to the pipeline constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub variant: PipelineVariant,
    pub triage: StageConfig,
    pub clarify: StageConfig,
    pub instruct: StageConfig,
    pub research: StageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: PipelineVariant::default(),
            triage: StageConfig::new(
                DEFAULT_BASE_MODEL,
                "Analyze if the research query needs clarification.",
            ),
            clarify: StageConfig::new(
                DEFAULT_BASE_MODEL,
                "Generate 2-3 specific clarifying questions.",
            ),
            instruct: StageConfig::new(
                DEFAULT_BASE_MODEL,
                "Rewrite the user's research request, including any clarifying context, \
                 as detailed instructions for a research assistant. Frame the topic, state \
                 the depth expected, describe the report format (headings, tables where \
                 useful, inline citations) and prefer recent, primary sources. \
                 Return only the instructions.",
            ),
            research: StageConfig::new(
                DEFAULT_RESEARCH_MODEL,
                "Perform deep empirical research based on the user's instructions.",
            ),
        }
    }
}

impl PipelineConfig {
    /// Validate stage settings and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, stage) in [
            ("triage", &self.triage),
            ("clarify", &self.clarify),
            ("instruct", &self.instruct),
            ("research", &self.research),
        ] {
            if stage.model.trim().is_empty() {
                warnings.push(format!("pipeline.{name}.model is empty"));
            }
            if stage.instructions.trim().is_empty() {
                warnings.push(format!("pipeline.{name}.instructions is empty"));
            }
        }
        warnings
    }
}

/// Where confirmed reports are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub reports_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `SLEUTH_`)
/// 3. Workspace-local config (`.sleuth/config.toml`)
/// 4. User config (`~/.config/sleuth/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SleuthConfig>,
) -> Result<SleuthConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(SleuthConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".sleuth").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // SLEUTH_PIPELINE__VARIANT, SLEUTH_OUTPUT__REPORTS_DIR, ...
    figment = figment.merge(Env::prefixed("SLEUTH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Path of the user-level config file, if a home directory can be resolved.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "sleuth", "sleuth")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
