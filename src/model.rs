//! Values passed between pipeline stages.
//!
//! Each type is owned by exactly one request. Nothing here is shared across
//! concurrent runs, and nothing is persisted except what the publisher writes.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One incoming analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub source_location: String,
}

impl AnalysisRequest {
    pub fn new(source_location: impl Into<String>) -> Self {
        Self {
            source_location: source_location.into(),
        }
    }
}

/// Fully downloaded source bytes.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Text of a document, one segment per page in page order.
///
/// Empty pages stay in `pages` as empty strings; [`ExtractedText::as_text`]
/// therefore always contains exactly `page_count() - 1` newlines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pages: Vec<String>,
}

/// Marker placed between consecutive pages.
pub const PAGE_BOUNDARY: char = '\n';

impl ExtractedText {
    /// Build from per-page text runs: runs are joined by a single space and
    /// any line breaks inside a run are folded into spaces.
    pub fn from_page_runs<I, P, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pages = pages
            .into_iter()
            .map(|runs| {
                runs.into_iter()
                    .map(|run| fold_line_breaks(run.as_ref()))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// The flattened text sent to the language model.
    pub fn as_text(&self) -> String {
        self.pages.join(&PAGE_BOUNDARY.to_string())
    }
}

fn fold_line_breaks(run: &str) -> String {
    run.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Markdown report produced by the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub markdown: String,
}

/// Paginated PDF bytes produced by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
}

impl RenderedArtifact {
    pub const CONTENT_TYPE: &'static str = "application/pdf";
}

/// A stored report and its time-limited link.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedArtifact {
    pub storage_key: String,
    pub signed_url: String,
    pub published_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
