//! The review pipeline: one request in, one signed report URL out.
//!
//! ## Execution model
//!
//! [`ReviewPipeline::run`] walks a single request through
//! fetch → extract → analyze → render → publish, strictly in sequence. Each
//! stage's output is moved into the next and dropped as soon as it has been
//! consumed; nothing survives the call except the published object.
//!
//! The pipeline value itself is immutable after construction, so one
//! `Arc<ReviewPipeline>` serves any number of concurrent runs. Runs share
//! only the components (HTTP client, provider, render semaphore, S3 client).
//!
//! ## Failure
//!
//! The first stage error ends the run: the state moves to
//! [`PipelineState::Failed`], the error is logged with its
//! [`ReviewError::kind`], and it is returned unchanged. Nothing is retried and
//! nothing already written is rolled back.

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::model::{AnalysisRequest, PublishedArtifact};
use crate::observer::{NoopObserver, PipelineObserver, PipelineState, SharedObserver};
use crate::pipeline::analyze::{LlmCompletionService, ReportGenerator};
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::fetch::DocumentFetcher;
use crate::pipeline::publish::{ArtifactPublisher, S3ArtifactStore};
use crate::pipeline::render::{ChromeRenderer, DocumentRenderer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Orchestrates one review per [`run`](ReviewPipeline::run) call.
pub struct ReviewPipeline {
    fetcher: DocumentFetcher,
    extractor: Arc<dyn TextExtractor>,
    generator: ReportGenerator,
    renderer: Arc<dyn DocumentRenderer>,
    publisher: ArtifactPublisher,
    observer: SharedObserver,
}

impl ReviewPipeline {
    /// Assemble a pipeline from ready-made stages.
    pub fn new(
        fetcher: DocumentFetcher,
        extractor: Arc<dyn TextExtractor>,
        generator: ReportGenerator,
        renderer: Arc<dyn DocumentRenderer>,
        publisher: ArtifactPublisher,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            generator,
            renderer,
            publisher,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build the production pipeline: pdfium, the configured LLM provider,
    /// headless Chromium and S3.
    ///
    /// Every credential and library is checked here, so a misconfigured
    /// process fails at startup with [`ReviewError::Configuration`].
    pub async fn from_config(config: &ReviewConfig) -> Result<Self, ReviewError> {
        config.validate()?;

        let fetcher = DocumentFetcher::new(&config.fetch)?;
        let extractor = PdfiumExtractor::new(config.pdfium_library_path.clone())?;
        let service = LlmCompletionService::from_settings(&config.llm)?;
        let generator = ReportGenerator::new(
            Arc::new(service),
            Duration::from_secs(config.llm.timeout_secs),
        );
        let renderer = ChromeRenderer::new(&config.render);
        let store = S3ArtifactStore::connect(&config.storage).await?;
        let publisher = ArtifactPublisher::new(
            Arc::new(store),
            Duration::from_secs(config.storage.url_ttl_secs),
        );

        info!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            bucket = %config.storage.bucket,
            max_renders = config.render.max_concurrent,
            "Review pipeline ready"
        );

        Ok(Self::new(
            fetcher,
            Arc::new(extractor),
            generator,
            Arc::new(renderer),
            publisher,
        ))
    }

    /// Report state transitions to `observer`.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run one review to completion.
    ///
    /// Repeated calls with the same request are independent and publish
    /// distinct artifacts.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<PublishedArtifact, ReviewError> {
        let mut tracker = RunTracker::new(self.observer.as_ref());
        let start = Instant::now();
        info!(run_id = %tracker.id, source = %request.source_location, "Review started");

        let result = self.execute(&mut tracker, request).await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(published) => {
                tracker.enter(PipelineState::Done);
                info!(
                    run_id = %tracker.id,
                    key = %published.storage_key,
                    elapsed_ms,
                    "Review complete"
                );
            }
            Err(e) => {
                let stage = tracker.state;
                tracker.fail(e);
                error!(
                    run_id = %tracker.id,
                    stage = %stage,
                    kind = e.kind(),
                    elapsed_ms,
                    error = %e,
                    "Review failed"
                );
            }
        }
        result
    }

    async fn execute(
        &self,
        tracker: &mut RunTracker<'_>,
        request: &AnalysisRequest,
    ) -> Result<PublishedArtifact, ReviewError> {
        tracker.enter(PipelineState::Fetching);
        let document = self.fetcher.fetch(&request.source_location).await?;

        tracker.enter(PipelineState::Extracting);
        let text = self.extractor.extract(document).await?;
        debug!(run_id = %tracker.id, pages = text.page_count(), "Text extracted");

        tracker.enter(PipelineState::Analyzing);
        let report = self.generator.generate(&text).await?;
        drop(text);

        tracker.enter(PipelineState::Rendering);
        let artifact = self.renderer.render(&report).await?;
        drop(report);

        tracker.enter(PipelineState::Publishing);
        self.publisher.publish(artifact).await
    }
}

/// Per-run state bookkeeping.
struct RunTracker<'a> {
    id: String,
    state: PipelineState,
    entered: Instant,
    observer: &'a dyn PipelineObserver,
}

impl<'a> RunTracker<'a> {
    fn new(observer: &'a dyn PipelineObserver) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            state: PipelineState::Idle,
            entered: Instant::now(),
            observer,
        }
    }

    fn enter(&mut self, to: PipelineState) {
        let from = self.state;
        debug_assert_eq!(from.next(), Some(to), "illegal transition {from} -> {to}");
        if from != PipelineState::Idle {
            debug!(
                run_id = %self.id,
                stage = %from,
                elapsed_ms = self.entered.elapsed().as_millis() as u64,
                "Stage complete"
            );
        }
        self.observer.on_transition(&self.id, from, to);
        self.state = to;
        self.entered = Instant::now();
    }

    fn fail(&mut self, error: &ReviewError) {
        let from = self.state;
        self.observer.on_failure(&self.id, from, error);
        self.observer.on_transition(&self.id, from, PipelineState::Failed);
        self.state = PipelineState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        transitions: Mutex<Vec<(PipelineState, PipelineState)>>,
        failures: Mutex<Vec<(PipelineState, &'static str)>>,
    }

    impl PipelineObserver for Recorder {
        fn on_transition(&self, _run_id: &str, from: PipelineState, to: PipelineState) {
            self.transitions.lock().unwrap().push((from, to));
        }

        fn on_failure(&self, _run_id: &str, stage: PipelineState, error: &ReviewError) {
            self.failures.lock().unwrap().push((stage, error.kind()));
        }
    }

    #[test]
    fn tracker_walks_forward() {
        let recorder = Recorder::default();
        let mut tracker = RunTracker::new(&recorder);
        tracker.enter(PipelineState::Fetching);
        tracker.enter(PipelineState::Extracting);
        assert_eq!(
            *recorder.transitions.lock().unwrap(),
            vec![
                (PipelineState::Idle, PipelineState::Fetching),
                (PipelineState::Fetching, PipelineState::Extracting),
            ]
        );
    }

    #[test]
    fn tracker_failure_reports_active_stage() {
        let recorder = Recorder::default();
        let mut tracker = RunTracker::new(&recorder);
        tracker.enter(PipelineState::Fetching);
        tracker.fail(&ReviewError::fetch("u", "HTTP 404"));

        assert_eq!(tracker.state, PipelineState::Failed);
        assert_eq!(
            *recorder.failures.lock().unwrap(),
            vec![(PipelineState::Fetching, "fetch_error")]
        );
        assert_eq!(
            recorder.transitions.lock().unwrap().last(),
            Some(&(PipelineState::Fetching, PipelineState::Failed))
        );
    }

    #[test]
    fn run_ids_are_unique() {
        let a = RunTracker::new(&NoopObserver);
        let b = RunTracker::new(&NoopObserver);
        assert_ne!(a.id, b.id);
    }
}
