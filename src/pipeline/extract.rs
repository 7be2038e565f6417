//! Text extraction: PDF bytes → [`ExtractedText`] via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and no async API. All
//! parsing runs on Tokio's blocking pool so worker threads keep serving
//! other requests while a large contract is being read.
//!
//! ## Failure policy
//!
//! Extraction is fail-fast: pages are read in ascending order and the first
//! page that cannot be loaded or read aborts the whole document with
//! [`ReviewError::Parse`]. Later pages are not touched. A report built on a
//! contract with silently missing pages would be worse than no report.

use crate::error::ReviewError;
use crate::model::{ExtractedText, RawDocument};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns a downloaded document into page-ordered text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: RawDocument) -> Result<ExtractedText, ReviewError>;
}

/// A page that could not be read. `page` is 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFault {
    pub page: usize,
    pub detail: String,
}

/// Assemble per-page text runs into [`ExtractedText`], stopping at the first
/// page fault.
///
/// The iterator is consumed lazily, so pages after a fault are never read.
pub fn assemble_pages<I>(pages: I) -> Result<ExtractedText, ReviewError>
where
    I: IntoIterator<Item = Result<Vec<String>, PageFault>>,
{
    let mut runs = Vec::new();
    for page in pages {
        match page {
            Ok(page_runs) => runs.push(page_runs),
            Err(fault) => {
                return Err(ReviewError::Parse {
                    detail: format!("page {}: {}", fault.page, fault.detail),
                });
            }
        }
    }

    let text = ExtractedText::from_page_runs(runs);
    if text.page_count() == 0 || text.is_blank() {
        return Err(ReviewError::EmptyDocument {
            pages: text.page_count(),
        });
    }
    Ok(text)
}

/// Verify the `%PDF` magic bytes.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), ReviewError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let shown = &bytes[..bytes.len().min(4)];
        return Err(ReviewError::Parse {
            detail: format!("not a PDF (first bytes: {shown:?})"),
        });
    }
    Ok(())
}

/// pdfium-backed extractor.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Bind pdfium once to make sure the library is loadable.
    ///
    /// `library_path` may point at the shared library itself or at the
    /// directory holding it; `None` binds the system library.
    pub fn new(library_path: Option<PathBuf>) -> Result<Self, ReviewError> {
        bind_pdfium(library_path.as_deref())
            .map_err(|e| ReviewError::Configuration(format!("cannot load pdfium: {e:?}")))?;
        Ok(Self { library_path })
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, document: RawDocument) -> Result<ExtractedText, ReviewError> {
        check_pdf_magic(&document.bytes)?;

        let library_path = self.library_path.clone();
        tokio::task::spawn_blocking(move || {
            extract_blocking(library_path.as_deref(), &document.bytes)
        })
        .await
        .map_err(|e| ReviewError::Parse {
            detail: format!("extraction task panicked: {e}"),
        })?
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, PdfiumError> {
    let bindings = match library_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))?
        }
        Some(path) => Pdfium::bind_to_library(path)?,
        None => Pdfium::bind_to_system_library()?,
    };
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of text extraction.
fn extract_blocking(
    library_path: Option<&Path>,
    bytes: &[u8],
) -> Result<ExtractedText, ReviewError> {
    let pdfium = bind_pdfium(library_path).map_err(|e| ReviewError::Parse {
        detail: format!("pdfium unavailable: {e:?}"),
    })?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ReviewError::Parse {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!(pages = total_pages, "PDF loaded");

    let per_page = (0..total_pages).map(|idx| -> Result<Vec<String>, PageFault> {
        let fault = |e: PdfiumError| PageFault {
            page: idx + 1,
            detail: format!("{e:?}"),
        };
        let page = pages.get(idx as u16).map_err(fault)?;
        let text = page.text().map_err(fault)?;
        let runs: Vec<String> = text
            .segments()
            .iter()
            .map(|segment| segment.text())
            .filter(|run| !run.trim().is_empty())
            .collect();
        debug!(page = idx + 1, runs = runs.len(), "Extracted page text");
        Ok(runs)
    });

    assemble_pages(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn page(runs: &[&str]) -> Result<Vec<String>, PageFault> {
        Ok(runs.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn pages_join_in_order() {
        let text = assemble_pages(vec![
            page(&["1.", "Term"]),
            page(&["2.", "Payment"]),
            page(&["3.", "Liability"]),
        ])
        .unwrap();
        assert_eq!(text.as_text(), "1. Term\n2. Payment\n3. Liability");
    }

    #[test]
    fn zero_pages_is_empty_document() {
        let err = assemble_pages(Vec::new()).unwrap_err();
        assert!(matches!(err, ReviewError::EmptyDocument { pages: 0 }));
    }

    #[test]
    fn pages_without_text_is_empty_document() {
        let err = assemble_pages(vec![page(&[]), page(&[])]).unwrap_err();
        assert!(matches!(err, ReviewError::EmptyDocument { pages: 2 }));
    }

    #[test]
    fn first_bad_page_aborts_and_later_pages_are_not_read() {
        let reads = Cell::new(0);
        let pages = (1..=4).map(|n| {
            reads.set(reads.get() + 1);
            if n == 2 {
                Err(PageFault {
                    page: n,
                    detail: "broken content stream".into(),
                })
            } else {
                page(&["text"])
            }
        });

        let err = assemble_pages(pages).unwrap_err();
        match err {
            ReviewError::Parse { detail } => assert!(detail.starts_with("page 2:"), "{detail}"),
            other => panic!("expected Parse, got {other:?}"),
        }
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn blank_middle_page_is_kept() {
        let text = assemble_pages(vec![page(&["a"]), page(&[]), page(&["c"])]).unwrap();
        assert_eq!(text.page_count(), 3);
        assert_eq!(text.as_text().matches('\n').count(), 2);
    }

    #[test]
    fn magic_check() {
        assert!(check_pdf_magic(b"%PDF-1.7\n...").is_ok());
        assert!(matches!(
            check_pdf_magic(b"<html>").unwrap_err(),
            ReviewError::Parse { .. }
        ));
        assert!(check_pdf_magic(b"").is_err());
    }
}
