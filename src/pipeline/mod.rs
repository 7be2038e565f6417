//! Pipeline stages for contract review.
//!
//! Each submodule implements exactly one transformation step and knows
//! nothing about its neighbours. The orchestrator in [`crate::review`]
//! threads one request's values through them in order.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──▶ analyze ──▶ html ──▶ render ──▶ publish
//! (HTTP)    (pdfium)    (LLM)       (md)     (Chrome)   (S3)
//! ```
//!
//! 1. [`fetch`]   - download the source PDF in full
//! 2. [`extract`] - page-ordered text; `spawn_blocking` because pdfium is
//!    not async-safe
//! 3. [`analyze`] - one completion round-trip, then [`postprocess`] cleanup
//! 4. [`html`]    - markdown to HTML inside the fixed page template
//! 5. [`render`]  - HTML to A4 PDF in a scoped headless browser
//! 6. [`publish`] - store under a unique key and sign a read URL
//!
//! Stages with an external dependency sit behind a trait
//! ([`extract::TextExtractor`], [`analyze::CompletionService`],
//! [`render::DocumentRenderer`], [`publish::ArtifactStore`]) so the
//! orchestrator can be driven without pdfium, a model, Chrome or a bucket.

pub mod analyze;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod postprocess;
pub mod publish;
pub mod render;
