//! Shared fixtures for the integration tests: a local document server and
//! in-memory stand-ins for pdfium, the model, Chromium and the bucket.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use contract_review::pipeline::analyze::{CompletionService, ReportGenerator};
use contract_review::pipeline::extract::{assemble_pages, PageFault, TextExtractor};
use contract_review::pipeline::fetch::DocumentFetcher;
use contract_review::pipeline::html::{render_report_html, ReportTemplate};
use contract_review::pipeline::publish::{ArtifactPublisher, ArtifactStore, StoreError};
use contract_review::pipeline::render::DocumentRenderer;
use contract_review::{
    AnalysisReport, ExtractedText, FetchSettings, PipelineObserver, PipelineState, RawDocument,
    RenderedArtifact, ReviewError, ReviewPipeline,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Page separator understood by [`FormFeedExtractor`].
pub const PAGE_BREAK: char = '\x0c';

pub const THREE_PAGE_CONTRACT: &str =
    "1. Term twelve months\x0c2. Payment due in 7 days\x0c3. Liability unlimited";

// ── Local document server ────────────────────────────────────────────────────

/// Serves fixture documents on 127.0.0.1 and returns the base URL.
///
/// | Path | Response |
/// |------|----------|
/// | `/contract.pdf` | [`THREE_PAGE_CONTRACT`] |
/// | `/blank.pdf` | two pages without text |
/// | `/empty.pdf` | zero bytes (zero pages) |
/// | `/big.pdf` | 64 KiB |
/// | `/slow.pdf` | responds after 3 s |
/// | anything else | 404 |
pub async fn spawn_document_server() -> String {
    let app = Router::new()
        .route("/contract.pdf", get(|| async { THREE_PAGE_CONTRACT }))
        .route("/blank.pdf", get(|| async { "  \x0c\n" }))
        .route("/empty.pdf", get(|| async { "" }))
        .route("/big.pdf", get(|| async { vec![b'x'; 64 * 1024] }))
        .route(
            "/slow.pdf",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                THREE_PAGE_CONTRACT
            }),
        )
        .fallback(|| async { (StatusCode::NOT_FOUND, "no such document") });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// Treats the body as UTF-8 text with pages separated by form feeds and
/// whitespace-separated runs. An empty body has zero pages.
#[derive(Default)]
pub struct FormFeedExtractor {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextExtractor for FormFeedExtractor {
    async fn extract(&self, document: RawDocument) -> Result<ExtractedText, ReviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = String::from_utf8(document.bytes).map_err(|e| ReviewError::Parse {
            detail: e.to_string(),
        })?;
        let pages: Vec<Result<Vec<String>, PageFault>> = if body.is_empty() {
            Vec::new()
        } else {
            body.split(PAGE_BREAK)
                .map(|page| Ok(page.split_whitespace().map(str::to_string).collect()))
                .collect()
        };
        assemble_pages(pages)
    }
}

// ── Completion service ───────────────────────────────────────────────────────

pub const REPORT_MARKDOWN: &str = "# Contract Review\n\n## Summary\n\nThe contract is one-sided.\n\n> 3. Liability unlimited\n";

/// Answers every request with a fixed report and records what it was sent.
pub struct CannedCompletion {
    pub answer: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedCompletion {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(format!("```markdown\n{REPORT_MARKDOWN}```")),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for CannedCompletion {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<String, ReviewError> {
        self.prompts.lock().unwrap().push(user.to_string());
        self.answer.clone().map_err(|message| ReviewError::Upstream {
            provider: "canned".into(),
            message,
        })
    }
}

// ── Renderer ─────────────────────────────────────────────────────────────────

/// Produces `%PDF-` followed by the report HTML.
#[derive(Default)]
pub struct HtmlPdfRenderer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DocumentRenderer for HtmlPdfRenderer {
    async fn render(&self, report: &AnalysisReport) -> Result<RenderedArtifact, ReviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let template = ReportTemplate {
            title: "Contract Protect".into(),
            logo_url: None,
        };
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend_from_slice(render_report_html(&report.markdown, &template).as_bytes());
        Ok(RenderedArtifact { bytes })
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub signed_from: Mutex<Vec<DateTime<Utc>>>,
    pub fail_signing: bool,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl MemoryStore {
    pub fn refusing_to_sign() -> Self {
        Self {
            fail_signing: true,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign(
        &self,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        self.signed_from.lock().unwrap().push(issued_at);
        if self.fail_signing {
            return Err(StoreError("credentials cannot sign".into()));
        }
        Ok(format!(
            "https://reports.test/{key}?X-Amz-Expires={}&X-Amz-Signature=feed",
            ttl.as_secs()
        ))
    }
}

// ── Observer ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingObserver {
    pub transitions: Mutex<Vec<(String, PipelineState, PipelineState)>>,
    pub failures: Mutex<Vec<(PipelineState, &'static str)>>,
}

impl RecordingObserver {
    /// States entered, in order, across all runs.
    pub fn entered(&self) -> Vec<PipelineState> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, to)| *to)
            .collect()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_transition(&self, run_id: &str, from: PipelineState, to: PipelineState) {
        self.transitions
            .lock()
            .unwrap()
            .push((run_id.to_string(), from, to));
    }

    fn on_failure(&self, _run_id: &str, stage: PipelineState, error: &ReviewError) {
        self.failures.lock().unwrap().push((stage, error.kind()));
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

pub const URL_TTL: Duration = Duration::from_secs(3600);

/// A pipeline wired to fakes, with handles to inspect each of them.
pub struct Harness {
    pub pipeline: ReviewPipeline,
    pub extractor: Arc<FormFeedExtractor>,
    pub completion: Arc<CannedCompletion>,
    pub renderer: Arc<HtmlPdfRenderer>,
    pub store: Arc<MemoryStore>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(CannedCompletion::ok(), MemoryStore::default())
    }

    pub fn with(completion: Arc<CannedCompletion>, store: MemoryStore) -> Self {
        let settings = FetchSettings {
            timeout_secs: 1,
            ..FetchSettings::default()
        };
        let fetcher = DocumentFetcher::new(&settings).unwrap();
        let extractor = Arc::new(FormFeedExtractor::default());
        let renderer = Arc::new(HtmlPdfRenderer::default());
        let store = Arc::new(store);
        let observer = Arc::new(RecordingObserver::default());

        let pipeline = ReviewPipeline::new(
            fetcher,
            extractor.clone(),
            ReportGenerator::new(completion.clone(), Duration::from_secs(5)),
            renderer.clone(),
            ArtifactPublisher::new(store.clone(), URL_TTL),
        )
        .with_observer(observer.clone());

        Self {
            pipeline,
            extractor,
            completion,
            renderer,
            store,
            observer,
        }
    }
}
