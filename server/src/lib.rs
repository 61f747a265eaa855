use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sitesearch_core::{DocId, ResultEntry, SearchIndex};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_K: usize = 10;
pub const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ResultEntry>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: SearchIndex,
}

/// Serves the index stored under `index_dir`.
pub fn build_app(index_dir: &str) -> Result<Router> {
    let index = SearchIndex::open_existing(index_dir).with_context(|| format!("opening index at {index_dir}"))?;
    tracing::info!(index_dir, num_docs = index.len(), num_terms = index.num_terms(), "index loaded");
    Ok(build_app_with_index(index))
}

pub fn build_app_with_index(index: SearchIndex) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { index })
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// CORS origins from `CORS_ALLOW_ORIGIN` (comma-separated); any origin otherwise.
fn cors_layer() -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(origins))
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_K);
    let found = state.index.search(&params.q, k);
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, k, total_hits = found.total_hits, took_ms = elapsed.as_millis() as u64, "search");
    Json(SearchResponse {
        query: found.query,
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        total_hits: found.total_hits,
        results: found.results,
    })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match state.index.get_by_id(doc_id) {
        Some(doc) => Ok(Json(serde_json::json!({
            "doc_id": doc_id,
            "url": doc.url,
            "title": doc.title,
            "heading": doc.heading,
            "keywords": doc.keywords,
            "description": doc.description,
            "text": doc.content,
        }))),
        None => Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" })))),
    }
}
