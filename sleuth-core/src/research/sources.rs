//! Citation extraction from research-stage output.
//!
//! Two reply shapes carry sources:
//! - inline `url_citation` annotations on message text parts
//! - web-search tool-call items listing the sources they consulted
//!
//! The shape is resolved once per result into a `CitationSource`.
//! Annotations win when they yield anything; order is preserved and no
//! deduplication is done.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title used when a source omits one.
pub const DEFAULT_TITLE: &str = "Source";

/// A referenced source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

impl Citation {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Build from an object carrying `url` and optional `title`.
    ///
    /// Entries with a missing or blank URL are not citations.
    fn from_object(obj: &Value) -> Option<Self> {
        let url = obj.get("url")?.as_str()?.trim();
        if url.is_empty() {
            return None;
        }
        let title = obj
            .get("title")
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        Some(Self::new(title, url))
    }
}

/// Which reply shape the citations came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "citations", rename_all = "snake_case")]
pub enum CitationSource {
    Annotations(Vec<Citation>),
    ToolResults(Vec<Citation>),
    None,
}

impl CitationSource {
    /// Inspect a raw research reply and pick the shape that carries citations.
    pub fn resolve(raw: &Value) -> Self {
        let annotated = annotation_citations(raw);
        if !annotated.is_empty() {
            return CitationSource::Annotations(annotated);
        }
        let tool = tool_result_citations(raw);
        if !tool.is_empty() {
            return CitationSource::ToolResults(tool);
        }
        CitationSource::None
    }

    /// Short label for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            CitationSource::Annotations(_) => "annotations",
            CitationSource::ToolResults(_) => "tool_results",
            CitationSource::None => "none",
        }
    }

    pub fn citations(&self) -> &[Citation] {
        match self {
            CitationSource::Annotations(c) | CitationSource::ToolResults(c) => c,
            CitationSource::None => &[],
        }
    }

    pub fn into_citations(self) -> Vec<Citation> {
        match self {
            CitationSource::Annotations(c) | CitationSource::ToolResults(c) => c,
            CitationSource::None => Vec::new(),
        }
    }
}

/// Extract citations from a raw research reply.
pub fn extract_citations(raw: &Value) -> Vec<Citation> {
    CitationSource::resolve(raw).into_citations()
}

fn output_items<'a>(raw: &'a Value, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    raw.get("output")
        .and_then(|o| o.as_array())
        .into_iter()
        .flatten()
        .filter(move |item| item.get("type").and_then(|t| t.as_str()) == Some(kind))
}

/// Shape (a): `message` items whose text parts carry `url_citation` annotations.
///
/// Accepts both the flat form (`{type, url, title}`) and the nested form
/// (`{type, url_citation: {url, title}}`).
fn annotation_citations(raw: &Value) -> Vec<Citation> {
    let mut out = Vec::new();
    for item in output_items(raw, "message") {
        for part in item
            .get("content")
            .and_then(|c| c.as_array())
            .into_iter()
            .flatten()
        {
            for ann in part
                .get("annotations")
                .and_then(|a| a.as_array())
                .into_iter()
                .flatten()
            {
                if ann.get("type").and_then(|t| t.as_str()) != Some("url_citation") {
                    continue;
                }
                let body = ann.get("url_citation").unwrap_or(ann);
                if let Some(citation) = Citation::from_object(body) {
                    out.push(citation);
                }
            }
        }
    }
    out
}

/// Shape (b): sources listed by `web_search_call` items, then any top-level
/// `citations` array.
fn tool_result_citations(raw: &Value) -> Vec<Citation> {
    let mut out = Vec::new();
    for call in output_items(raw, "web_search_call") {
        for source in call
            .get("action")
            .and_then(|a| a.get("sources"))
            .and_then(|s| s.as_array())
            .into_iter()
            .flatten()
        {
            if let Some(citation) = Citation::from_object(source) {
                out.push(citation);
            }
        }
    }
    for entry in raw
        .get("citations")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
    {
        if let Some(citation) = Citation::from_object(entry) {
            out.push(citation);
        }
    }
    out
}
