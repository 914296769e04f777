//! HTTP surface for the quality scoring service.
//!
//! Thin by design: fetch a bundle through the provider seam, run the
//! engine, decorate the result with rating bands, and hand JSON to the
//! browser dashboard. All scoring logic lives in `quality-score`.

pub mod routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fmp_client::{mock::MockProvider, FmpClient};
use quality_score::QualityScoreEngine;
use score_core::{BundleProvider, ScoreError};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QualityScoreEngine>,
    pub provider: Arc<dyn BundleProvider>,
    /// Present only when talking to the real API; cache and search routes
    /// need the concrete client
    pub fmp: Option<FmpClient>,
}

impl AppState {
    pub fn with_provider(provider: Arc<dyn BundleProvider>) -> Self {
        Self {
            engine: Arc::new(QualityScoreEngine::new()),
            provider,
            fmp: None,
        }
    }

    pub fn with_fmp(client: FmpClient) -> Self {
        Self {
            engine: Arc::new(QualityScoreEngine::new()),
            provider: Arc::new(client.clone()),
            fmp: Some(client),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unavailable(String),
    Upstream(ScoreError),
}

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        AppError::Upstream(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Upstream(err) => {
                tracing::error!(%err, "upstream failure");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = if std::env::var("FMP_USE_MOCK").map(|v| v == "1").unwrap_or(false) {
        tracing::warn!("FMP_USE_MOCK=1: serving fixture data, no network calls");
        AppState::with_provider(Arc::new(MockProvider))
    } else {
        let api_key = std::env::var("FMP_API_KEY")
            .map_err(|_| anyhow::anyhow!("FMP_API_KEY is required (or set FMP_USE_MOCK=1)"))?;
        AppState::with_fmp(FmpClient::new(api_key))
    };

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("score server listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
