//! # contract-review
//!
//! Review contract PDFs with a language model and publish the risk report as
//! a time-limited download link.
//!
//! ## Pipeline Overview
//!
//! ```text
//! sourceLocation (URL)
//!  │
//!  ├─ 1. Fetch    download the PDF in full (reqwest)
//!  ├─ 2. Extract  page-ordered text via pdfium (spawn_blocking)
//!  ├─ 3. Analyze  one chat completion: summary, quoted clauses, harm,
//!  │              remediation, negotiation email (edgequake-llm)
//!  ├─ 4. Render   markdown → HTML template → A4 PDF (headless Chromium)
//!  └─ 5. Publish  store under annotated_contracts/ and sign a GET URL (S3)
//! ```
//!
//! Each request runs the stages strictly in order. The first failure ends
//! the run; nothing is retried.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contract_review::{AnalysisRequest, ReviewConfig, ReviewPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OPENAI_API_KEY, S3_BUCKET, S3_ACCESS_KEY, S3_SECRET_KEY, ...
//!     let config = ReviewConfig::from_env()?;
//!     let pipeline = ReviewPipeline::from_config(&config).await?;
//!     let published = pipeline
//!         .run(&AnalysisRequest::new("https://uploads.example.com/lease.pdf"))
//!         .await?;
//!     println!("{}", published.signed_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `contract-review` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! ## Runtime Requirements
//!
//! - libpdfium, found on the system library path or via `PDFIUM_LIB_PATH`
//! - a Chrome or Chromium executable, found on `PATH` or via `CHROME_PATH`

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod pipeline;
pub mod prompts;
pub mod review;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FetchSettings, LlmSettings, RenderSettings, ReviewConfig, ReviewConfigBuilder,
    ServerSettings, StorageSettings, ARTIFACT_PREFIX,
};
pub use error::ReviewError;
pub use model::{
    AnalysisReport, AnalysisRequest, ExtractedText, PublishedArtifact, RawDocument,
    RenderedArtifact,
};
pub use observer::{NoopObserver, PipelineObserver, PipelineState, SharedObserver};
pub use review::ReviewPipeline;
