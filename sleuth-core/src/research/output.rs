//! Research results and report persistence.

use super::sources::Citation;
use crate::types::TokenUsage;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Line shown in place of sources when the report cites none.
pub const NO_SOURCES_NOTE: &str = "Research completed without citable sources";

/// Upper bound on suffixed names tried when the timestamped name is taken.
const MAX_NAME_ATTEMPTS: usize = 100;

/// Final artifact of a run: the report body and the sources it cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub report: String,
    pub citations: Vec<Citation>,
    /// Model that produced the report.
    pub model: String,
    /// Usage of the research call alone.
    pub usage: TokenUsage,
}

/// Console listing of `citations`.
///
/// ```text
/// SOURCES (2 found):
/// - Source A: https://a.example
/// - Source B: https://b.example
/// ```
pub fn render_sources(citations: &[Citation]) -> String {
    let mut out = format!("SOURCES ({} found):", citations.len());
    for c in citations {
        out.push_str(&format!("\n- {}: {}", c.title, c.url));
    }
    if citations.is_empty() {
        out.push_str(&format!("\n- {NO_SOURCES_NOTE}"));
    }
    out
}

/// Writes report files into a single directory.
///
/// Files are created, never overwritten: if the timestamped name exists a
/// numeric suffix is appended.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a report written at `at`.
    pub fn file_name(at: &DateTime<Local>) -> String {
        format!("report_{}.md", at.format("%Y%m%d_%H%M%S"))
    }

    /// Save `report` under a name derived from the current local time.
    pub fn save(&self, report: &str) -> std::io::Result<PathBuf> {
        self.save_at(report, &Local::now())
    }

    /// Save `report` under a name derived from `at`.
    pub fn save_at(&self, report: &str, at: &DateTime<Local>) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let base = Self::file_name(at);
        let stem = base.trim_end_matches(".md");
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{stem}_{attempt}.md")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_discard(file, &path, report)?;
                    info!(path = %path.display(), bytes = report.len(), "Report saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "no free report name for {} in {}",
                base,
                self.dir.display()
            ),
        ))
    }
}

/// Write `report` to `out`, deleting the file at `path` if the write fails.
fn write_or_discard(mut out: impl Write, path: &Path, report: &str) -> std::io::Result<()> {
    if let Err(e) = out.write_all(report.as_bytes()).and_then(|()| out.flush()) {
        drop(out);
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "Failed to remove partial report");
        }
        return Err(e);
    }
    Ok(())
}
