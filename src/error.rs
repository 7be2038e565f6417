//! Error types for the contract-review pipeline.
//!
//! Every stage reports failure through one enum, [`ReviewError`], with one
//! variant per failure kind. The orchestrator never inspects the variant to
//! decide what to do next: any error moves the run to `Failed`. The variant
//! exists for the logs, where [`ReviewError::kind`] gives a stable label.
//!
//! The HTTP boundary collapses every variant into the same caller-facing
//! response (see [`crate::server`]), so messages here can be as specific as
//! the operator needs without leaking anything to clients.

use thiserror::Error;

/// All errors returned by the contract-review pipeline.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Fetch ─────────────────────────────────────────────────────────────
    /// Source document could not be retrieved (network, non-2xx, timeout,
    /// oversize body, unsupported scheme).
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    // ── Extract ───────────────────────────────────────────────────────────
    /// Bytes are not a PDF, or a page could not be read.
    #[error("Failed to parse document: {detail}")]
    Parse { detail: String },

    /// The document has no pages, or no page carries any text.
    #[error("Document contains no extractable text ({pages} pages)")]
    EmptyDocument { pages: usize },

    // ── Config ────────────────────────────────────────────────────────────
    /// A required setting or credential is missing or invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ── Analyze ───────────────────────────────────────────────────────────
    /// The language-model service rejected the request, returned something
    /// unusable, or missed its deadline.
    #[error("Language model '{provider}' failed: {message}")]
    Upstream { provider: String, message: String },

    /// The language-model service answered with no content.
    #[error("Language model '{provider}' returned an empty report")]
    EmptyResponse { provider: String },

    // ── Render ────────────────────────────────────────────────────────────
    /// The headless browser could not start, load the report, or print it.
    #[error("Failed to render report: {detail}")]
    Render { detail: String },

    // ── Publish ───────────────────────────────────────────────────────────
    /// The object store rejected the write.
    #[error("Failed to upload '{key}': {reason}")]
    Upload { key: String, reason: String },

    /// The write succeeded but no signed URL could be produced.
    /// The object at `key` is orphaned.
    #[error("Failed to sign URL for '{key}': {reason}")]
    Signing { key: String, reason: String },
}

impl ReviewError {
    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewError::Fetch { .. } => "fetch_error",
            ReviewError::Parse { .. } => "parse_error",
            ReviewError::EmptyDocument { .. } => "empty_document_error",
            ReviewError::Configuration(_) => "configuration_error",
            ReviewError::Upstream { .. } => "upstream_error",
            ReviewError::EmptyResponse { .. } => "empty_response_error",
            ReviewError::Render { .. } => "render_error",
            ReviewError::Upload { .. } => "upload_error",
            ReviewError::Signing { .. } => "signing_error",
        }
    }

    pub(crate) fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        ReviewError::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn render(detail: impl std::fmt::Display) -> Self {
        ReviewError::Render {
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_display_names_url() {
        let e = ReviewError::fetch("https://store/missing.pdf", "HTTP 404 Not Found");
        let msg = e.to_string();
        assert!(msg.contains("https://store/missing.pdf"), "got: {msg}");
        assert!(msg.contains("404"), "got: {msg}");
    }

    #[test]
    fn signing_display_names_orphaned_key() {
        let e = ReviewError::Signing {
            key: "annotated_contracts/1_x_annotated_contract.pdf".into(),
            reason: "clock skew".into(),
        };
        assert!(e.to_string().contains("annotated_contracts/1_x"));
    }

    #[test]
    fn kinds_are_distinct() {
        let all = [
            ReviewError::fetch("u", "r"),
            ReviewError::Parse { detail: "d".into() },
            ReviewError::EmptyDocument { pages: 0 },
            ReviewError::Configuration("c".into()),
            ReviewError::Upstream {
                provider: "openai".into(),
                message: "429".into(),
            },
            ReviewError::EmptyResponse {
                provider: "openai".into(),
            },
            ReviewError::render("boom"),
            ReviewError::Upload {
                key: "k".into(),
                reason: "r".into(),
            },
            ReviewError::Signing {
                key: "k".into(),
                reason: "r".into(),
            },
        ];
        let mut kinds: Vec<_> = all.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), 9);
    }

    #[test]
    fn empty_document_display() {
        let e = ReviewError::EmptyDocument { pages: 0 };
        assert!(e.to_string().contains("0 pages"));
    }
}
