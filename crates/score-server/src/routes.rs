//! Score API Routes
//!
//! Endpoints for computed quality scores, paginated category metrics,
//! ticker search, and cache management.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use fmp_client::CacheStats;
use score_core::{Category, CategoryKind, Metric, MetricFormat, ScoreBand, ScoreResult, StockMatch};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

/// Metrics shown per page in the category detail view
const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Serialize)]
pub struct BandInfo {
    pub band: ScoreBand,
    pub label: &'static str,
    pub color: &'static str,
}

impl BandInfo {
    fn from_score(score: Option<f64>) -> Option<BandInfo> {
        ScoreBand::from_score(score).map(|band| BandInfo {
            band,
            label: band.label(),
            color: band.color(),
        })
    }
}

#[derive(Serialize)]
pub struct MetricView {
    pub label: String,
    pub value: Option<f64>,
    pub format: MetricFormat,
    pub score: Option<u8>,
    pub band: Option<BandInfo>,
}

impl From<&Metric> for MetricView {
    fn from(metric: &Metric) -> Self {
        MetricView {
            label: metric.label.clone(),
            value: metric.value,
            format: metric.format,
            score: metric.score,
            band: BandInfo::from_score(metric.score.map(f64::from)),
        }
    }
}

#[derive(Serialize)]
pub struct CategoryView {
    pub slug: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub score: Option<f64>,
    pub band: Option<BandInfo>,
    pub metrics: Vec<MetricView>,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        CategoryView {
            slug: category.kind.slug(),
            name: category.kind.name(),
            icon: category.kind.icon(),
            score: category.score,
            band: BandInfo::from_score(category.score),
            metrics: category.metrics.iter().map(MetricView::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct ScoreView {
    pub symbol: String,
    pub computed_at: chrono::DateTime<chrono::Utc>,
    pub global_score: Option<f64>,
    pub band: Option<BandInfo>,
    pub categories: Vec<CategoryView>,
}

impl From<&ScoreResult> for ScoreView {
    fn from(result: &ScoreResult) -> Self {
        ScoreView {
            symbol: result.symbol.clone(),
            computed_at: result.computed_at,
            global_score: result.global_score,
            band: BandInfo::from_score(result.global_score),
            categories: result.categories.iter().map(CategoryView::from).collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: usize,
    pub per_page: Option<usize>,
}

#[derive(Serialize)]
pub struct CategoryPage {
    pub slug: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub score: Option<f64>,
    pub band: Option<BandInfo>,
    pub page: usize,
    pub per_page: usize,
    pub total_metrics: usize,
    pub total_pages: usize,
    pub metrics: Vec<MetricView>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/score/:symbol", get(get_score))
        .route("/api/score/:symbol/category/:slug", get(get_category_page))
        .route("/api/symbols/search", get(search_symbols))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache/clear", post(clear_cache))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn compute(state: &AppState, symbol: &str) -> Result<ScoreResult, AppError> {
    let symbol = symbol.to_uppercase();
    let bundle = state.provider.financial_bundle(&symbol).await?;
    Ok(state.engine.compute_all_scores(&bundle))
}

async fn get_score(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<ScoreView>>, AppError> {
    let result = compute(&state, &symbol).await?;
    Ok(Json(ApiResponse::ok(ScoreView::from(&result))))
}

/// One category's metrics, paginated. Pagination is request-local state
/// keyed by the category slug; out-of-range pages clamp to the last page.
async fn get_category_page(
    State(state): State<AppState>,
    Path((symbol, slug)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<CategoryPage>>, AppError> {
    let kind = CategoryKind::from_slug(&slug)
        .ok_or_else(|| AppError::NotFound(format!("unknown category: {slug}")))?;

    let result = compute(&state, &symbol).await?;
    let category = result
        .categories
        .iter()
        .find(|c| c.kind == kind)
        .ok_or_else(|| AppError::NotFound(format!("unknown category: {slug}")))?;

    let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let total_metrics = category.metrics.len();
    let total_pages = total_metrics.div_ceil(per_page).max(1);
    let page = query.page.min(total_pages - 1);

    let metrics: Vec<MetricView> = category
        .metrics
        .iter()
        .skip(page * per_page)
        .take(per_page)
        .map(MetricView::from)
        .collect();

    Ok(Json(ApiResponse::ok(CategoryPage {
        slug: kind.slug(),
        name: kind.name(),
        icon: kind.icon(),
        score: category.score,
        band: BandInfo::from_score(category.score),
        page,
        per_page,
        total_metrics,
        total_pages,
        metrics,
    })))
}

async fn search_symbols(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<StockMatch>>>, AppError> {
    let client = state
        .fmp
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("search requires the live FMP client".to_string()))?;
    let matches = client.search(&query.q).await?;
    Ok(Json(ApiResponse::ok(matches)))
}

async fn cache_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<CacheStats>>, AppError> {
    let client = state
        .fmp
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("no cache in mock mode".to_string()))?;
    Ok(Json(ApiResponse::ok(client.cache_stats())))
}

async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let client = state
        .fmp
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("no cache in mock mode".to_string()))?;
    let removed = client.clear_cache();
    tracing::info!(removed, "cache cleared");
    Ok(Json(ApiResponse::ok(serde_json::json!({ "removed": removed }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fmp_client::mock::MockProvider;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> Router {
        router(AppState::with_provider(Arc::new(MockProvider)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(test_app(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_score_returns_six_decorated_categories() {
        let (status, body) = get_json(test_app(), "/api/score/amzn").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let data = &body["data"];
        assert_eq!(data["symbol"], "AMZN");
        assert_eq!(data["categories"].as_array().unwrap().len(), 6);
        assert!(data["global_score"].is_number());
        assert!(data["band"]["label"].is_string());
        assert_eq!(data["categories"][0]["slug"], "profitability");
    }

    #[tokio::test]
    async fn test_category_pagination_clamps_to_last_page() {
        let (status, body) =
            get_json(test_app(), "/api/score/AMZN/category/profitability?page=99&per_page=2").await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["total_metrics"], 5);
        assert_eq!(data["total_pages"], 3);
        assert_eq!(data["page"], 2);
        assert_eq!(data["metrics"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_404() {
        let (status, body) = get_json(test_app(), "/api/score/AMZN/category/momentum").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("momentum"));
    }

    #[tokio::test]
    async fn test_cache_routes_unavailable_in_mock_mode() {
        let (status, _) = get_json(test_app(), "/api/cache/stats").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
