//! Report rendering: template HTML → A4 PDF through headless Chromium.
//!
//! ## Browser lifetime
//!
//! Each render launches its own browser inside a [`BrowserSession`] and the
//! session is dropped before the render returns, on success and on every
//! error path. Dropping `headless_chrome::Browser` kills the child process,
//! so no Chromium outlives the request that started it.
//!
//! ## Bounding concurrency
//!
//! A Chromium instance costs a few hundred MB. [`ChromeRenderer`] holds a
//! semaphore sized by `RenderSettings::max_concurrent`; a render waits for a
//! permit rather than failing, and the permit travels into the blocking task
//! so it is released only once the browser is gone.
//!
//! ## Why spawn_blocking?
//!
//! `headless_chrome` is a synchronous client. The whole launch/load/print
//! sequence runs on the blocking pool.

use crate::config::RenderSettings;
use crate::error::ReviewError;
use crate::model::{AnalysisReport, RenderedArtifact};
use crate::pipeline::html::{render_report_html, ReportTemplate};
use async_trait::async_trait;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Turns a report into a paginated document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, report: &AnalysisReport) -> Result<RenderedArtifact, ReviewError>;
}

// ── Page geometry ────────────────────────────────────────────────────────────

const MM_PER_INCH: f64 = 25.4;

/// A4 width in inches (210 mm).
pub const A4_WIDTH_IN: f64 = 210.0 / MM_PER_INCH;
/// A4 height in inches (297 mm).
pub const A4_HEIGHT_IN: f64 = 297.0 / MM_PER_INCH;

/// Top and bottom margin in millimetres.
pub const MARGIN_VERTICAL_MM: f64 = 20.0;
/// Left and right margin in millimetres.
pub const MARGIN_HORIZONTAL_MM: f64 = 15.0;

fn mm_to_in(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Print settings: A4 portrait, fixed margins, backgrounds on.
pub fn print_options() -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(true),
        paper_width: Some(A4_WIDTH_IN),
        paper_height: Some(A4_HEIGHT_IN),
        margin_top: Some(mm_to_in(MARGIN_VERTICAL_MM)),
        margin_bottom: Some(mm_to_in(MARGIN_VERTICAL_MM)),
        margin_left: Some(mm_to_in(MARGIN_HORIZONTAL_MM)),
        margin_right: Some(mm_to_in(MARGIN_HORIZONTAL_MM)),
        ..Default::default()
    }
}

/// Resolves once every `<img>` has loaded or failed.
const WAIT_FOR_IMAGES_JS: &str = r#"Promise.all(Array.from(document.images).map(img =>
  img.complete ? true : new Promise(done => { img.onload = img.onerror = () => done(true); })
)).then(() => true)"#;

// ── Browser session ──────────────────────────────────────────────────────────

/// A running headless browser scoped to one render.
///
/// The browser process is terminated when the session is dropped.
pub struct BrowserSession {
    browser: Browser,
    started: Instant,
}

impl BrowserSession {
    /// Launch a headless browser.
    pub fn launch(chrome_path: Option<PathBuf>, timeout: Duration) -> Result<Self, ReviewError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(chrome_path)
            .idle_browser_timeout(timeout)
            .args(vec![
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
            ])
            .build()
            .map_err(|e| ReviewError::render(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| ReviewError::render(format!("browser failed to start: {e}")))?;
        debug!("Headless browser started");

        Ok(Self {
            browser,
            started: Instant::now(),
        })
    }

    /// Load `page_url`, wait for it to settle, and print it to PDF.
    pub fn print(&self, page_url: &str, timeout: Duration) -> Result<Vec<u8>, ReviewError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| ReviewError::render(format!("cannot open tab: {e}")))?;
        tab.set_default_timeout(timeout);

        tab.navigate_to(page_url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ReviewError::render(format!("report did not load: {e}")))?;

        tab.evaluate(WAIT_FOR_IMAGES_JS, true)
            .map_err(|e| ReviewError::render(format!("images did not settle: {e}")))?;

        let pdf = tab
            .print_to_pdf(Some(print_options()))
            .map_err(|e| ReviewError::render(format!("printing failed: {e}")))?;

        if pdf.is_empty() {
            return Err(ReviewError::render("browser produced an empty document"));
        }
        Ok(pdf)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!(
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Closing headless browser"
        );
    }
}

// ── Chrome renderer ──────────────────────────────────────────────────────────

/// [`DocumentRenderer`] backed by headless Chromium.
#[derive(Clone)]
pub struct ChromeRenderer {
    template: ReportTemplate,
    chrome_path: Option<PathBuf>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ChromeRenderer {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            template: ReportTemplate::from_settings(settings),
            chrome_path: settings.chrome_path.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            permits: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
        }
    }

    /// Renders that may start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl DocumentRenderer for ChromeRenderer {
    async fn render(&self, report: &AnalysisReport) -> Result<RenderedArtifact, ReviewError> {
        let html = render_report_html(&report.markdown, &self.template);

        if self.permits.available_permits() == 0 {
            warn!("All render slots busy, waiting");
        }
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ReviewError::render(format!("render pool closed: {e}")))?;

        let chrome_path = self.chrome_path.clone();
        let timeout = self.timeout;
        let start = Instant::now();

        let bytes = tokio::task::spawn_blocking(move || {
            render_blocking(permit, &html, chrome_path, timeout)
        })
        .await
        .map_err(|e| ReviewError::render(format!("render task panicked: {e}")))??;

        info!(
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Report rendered"
        );
        Ok(RenderedArtifact { bytes })
    }
}

/// Blocking implementation of rendering.
///
/// The page is written to a temporary `.html` file so relative resources and
/// large reports load the same way a browser would load any local page. Both
/// the file and the browser are released when this function returns.
fn render_blocking(
    _permit: OwnedSemaphorePermit,
    html: &str,
    chrome_path: Option<PathBuf>,
    timeout: Duration,
) -> Result<Vec<u8>, ReviewError> {
    let mut page = tempfile::Builder::new()
        .prefix("report-")
        .suffix(".html")
        .tempfile()
        .map_err(|e| ReviewError::render(format!("cannot create page file: {e}")))?;
    page.write_all(html.as_bytes())
        .and_then(|_| page.flush())
        .map_err(|e| ReviewError::render(format!("cannot write page file: {e}")))?;

    let page_url = format!("file://{}", page.path().display());
    let session = BrowserSession::launch(chrome_path, timeout)?;
    session.print(&page_url, timeout)
}
