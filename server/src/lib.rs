use anyhow::{Context, Result};
use axum::{extract::{Query, State}, http::{HeaderValue, StatusCode}, routing::get, Json, Router};
use search_core::{Collection, QueryEngine, RankingConfig, SledStore, TextPipeline};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type Engine = QueryEngine<SledStore, Collection<SledStore>>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub collection_dir: PathBuf,
    pub ranking: RankingConfig,
    pub stopwords: Option<PathBuf>,
    pub query_timeout: Duration,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub score: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub query_timeout: Duration,
}

/// Open the index and collection and build the router. Refuses an index whose
/// build did not complete.
pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let pipeline = match &config.stopwords {
        Some(path) => TextPipeline::from_stopwords_file(path)
            .with_context(|| format!("reading stop words from {}", path.display()))?,
        None => TextPipeline::new(),
    };
    let index = SledStore::open(&config.index_dir)
        .with_context(|| format!("opening index at {}", config.index_dir.display()))?;
    let documents = Collection::new(
        SledStore::open(&config.collection_dir)
            .with_context(|| format!("opening collection at {}", config.collection_dir.display()))?,
    );
    let engine = QueryEngine::open(index, documents, pipeline, config.ranking)
        .with_context(|| format!("loading index at {}", config.index_dir.display()))?;
    tracing::info!(total_docs = engine.total_docs(), terms = engine.dictionary_len(), "index loaded");
    Ok(router(AppState { engine: Arc::new(engine), query_timeout: config.query_timeout }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

// CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let engine = state.engine.clone();
    let query = params.q.clone();
    let task = tokio::task::spawn_blocking(move || engine.search(&query));

    let hits = match tokio::time::timeout(state.query_timeout, task).await {
        Err(_) => {
            tracing::warn!(query = %params.q, "query timed out");
            return Err((StatusCode::GATEWAY_TIMEOUT, "query timed out".into()));
        }
        Ok(Err(join)) => {
            tracing::error!(query = %params.q, error = %join, "query task failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "query failed".into()));
        }
        Ok(Ok(Err(e))) => {
            tracing::error!(query = %params.q, error = %e, "query failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "query failed".into()));
        }
        Ok(Ok(Ok(hits))) => hits,
    };

    tracing::info!(query = %params.q, hits = hits.len(), took_s = start.elapsed().as_secs_f64(), "served query");
    Ok(Json(hits.into_iter().map(|h| SearchHit { url: h.url, score: h.score }).collect()))
}
