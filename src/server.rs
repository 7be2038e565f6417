//! HTTP surface: `POST /api/analyze-contract` and `GET /health`.
//!
//! Callers get exactly three outcomes from the analysis endpoint: the signed
//! URL, a 400 for a missing source, or one fixed 500 body. Pipeline error
//! detail is logged server-side and never returned.

use crate::config::ServerSettings;
use crate::model::AnalysisRequest;
use crate::review::ReviewPipeline;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReviewPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ReviewPipeline>) -> Self {
        Self { pipeline }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeContractRequest {
    #[serde(default)]
    pub source_location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeContractResponse {
    pub annotated_document_url: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Errors the HTTP boundary can return.
#[derive(Debug)]
pub enum ApiError {
    MissingSource,
    ProcessingFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::MissingSource => (StatusCode::BAD_REQUEST, "Missing sourceLocation"),
            ApiError::ProcessingFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request")
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze-contract", post(analyze_contract))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn analyze_contract(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeContractRequest>, JsonRejection>,
) -> Result<Json<AnalyzeContractResponse>, ApiError> {
    let source = match body {
        Ok(Json(AnalyzeContractRequest {
            source_location: Some(source),
        })) if !source.trim().is_empty() => source,
        Ok(_) => return Err(ApiError::MissingSource),
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable analysis request body");
            return Err(ApiError::MissingSource);
        }
    };

    // Detached so a dropped connection does not abort a half-finished run.
    let pipeline = Arc::clone(&state.pipeline);
    let request = AnalysisRequest::new(source.trim());
    let handle = tokio::spawn(async move { pipeline.run(&request).await });

    match handle.await {
        Ok(Ok(published)) => Ok(Json(AnalyzeContractResponse {
            annotated_document_url: published.signed_url,
        })),
        Ok(Err(_)) => Err(ApiError::ProcessingFailed),
        Err(e) => {
            error!(error = %e, "Review task aborted");
            Err(ApiError::ProcessingFailed)
        }
    }
}

/// Bind `settings.host:settings.port` and serve until Ctrl+C or SIGTERM.
pub async fn serve(pipeline: Arc<ReviewPipeline>, settings: &ServerSettings) -> std::io::Result<()> {
    let app = router(AppState::new(pipeline));
    let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    info!(addr = %listener.local_addr()?, "Contract review server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
