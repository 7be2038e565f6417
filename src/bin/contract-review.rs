//! CLI binary for contract-review.
//!
//! A thin shim over the library crate: `serve` runs the HTTP server,
//! `analyze` runs one review from the terminal, and `extract` prints the text
//! a review would send to the model.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contract_review::pipeline::extract::{PdfiumExtractor, TextExtractor};
use contract_review::pipeline::fetch::{is_url, DocumentFetcher};
use contract_review::{
    server, AnalysisRequest, FetchSettings, PipelineObserver, PipelineState, RawDocument,
    ReviewConfig, ReviewPipeline,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Shows the current pipeline state on a terminal spinner.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Reviewing");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineObserver for SpinnerObserver {
    fn on_transition(&self, _run_id: &str, _from: PipelineState, to: PipelineState) {
        match to {
            PipelineState::Done => self.bar.finish_with_message(green("done ✓")),
            PipelineState::Failed => self.bar.abandon_with_message(red("failed ✗")),
            state => self.bar.set_message(state.to_string()),
        }
    }
}

// ── CLI ──────────────────────────────────────────────────────────────────────

/// Review contract PDFs with a language model and publish the report.
#[derive(Parser, Debug)]
#[command(
    name = "contract-review",
    version,
    about = "Review contract PDFs with a language model and publish the report as a signed link",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CONTRACT_REVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CONTRACT_REVIEW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve,

    /// Run one review and print the signed report URL.
    Analyze {
        /// HTTP/HTTPS URL of the contract PDF.
        source: String,
    },

    /// Print the text extracted from a contract PDF (no model call).
    Extract {
        /// HTTP/HTTPS URL or local path of the contract PDF.
        source: String,

        /// Path to libpdfium or the directory containing it.
        #[arg(long, env = "PDFIUM_LIB_PATH")]
        pdfium: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || matches!(cli.command, Command::Analyze { .. }) {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            let config = ReviewConfig::from_env().context("Invalid configuration")?;
            let pipeline = ReviewPipeline::from_config(&config)
                .await
                .context("Failed to initialise review pipeline")?;
            server::serve(Arc::new(pipeline), &config.server)
                .await
                .context("HTTP server failed")?;
        }

        Command::Analyze { source } => {
            let config = ReviewConfig::from_env().context("Invalid configuration")?;
            let mut pipeline = ReviewPipeline::from_config(&config)
                .await
                .context("Failed to initialise review pipeline")?;
            if !cli.quiet {
                pipeline = pipeline.with_observer(SpinnerObserver::new());
            }

            let published = pipeline
                .run(&AnalysisRequest::new(source))
                .await
                .context("Review failed")?;

            println!("{}", published.signed_url);
            if !cli.quiet {
                eprintln!(
                    "{}",
                    dim(&format!(
                        "key: {}  expires: {}",
                        published.storage_key,
                        published.expires_at.to_rfc3339()
                    ))
                );
            }
        }

        Command::Extract { source, pdfium } => {
            let document = if is_url(&source) {
                DocumentFetcher::new(&FetchSettings::default())?
                    .fetch(&source)
                    .await?
            } else {
                let bytes = tokio::fs::read(&source)
                    .await
                    .with_context(|| format!("Cannot read '{source}'"))?;
                RawDocument { source, bytes }
            };

            let extractor = PdfiumExtractor::new(pdfium)?;
            let text = extractor.extract(document).await?;
            println!("{}", text.as_text());
            if !cli.quiet {
                eprintln!("{}", dim(&format!("{} pages", text.page_count())));
            }
        }
    }

    Ok(())
}
