mod cache;
mod config;
mod metrics;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use extract::{Extractor, RemoteTagger};
use graph::{Neo4jStore, RetryPolicy};
use query::{RetrievalEngine, RetrievalError, RetrievalRequest};

use crate::cache::QueryCache;
use crate::config::AppConfig;
use crate::metrics::Metrics;

#[derive(Clone)]
struct AppState {
    engine: Arc<RetrievalEngine>,
    metrics: Arc<Metrics>,
    cache: Arc<QueryCache>,
    cache_enabled: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();

    let retry = RetryPolicy::new(&config.graph.retry);
    let store = retry
        .retry("connect_graph", || Neo4jStore::connect(&config.graph))
        .await?;
    info!(uri = %config.graph.uri, "connected to graph store");

    let extractor = match &config.tagger_url {
        Some(url) => Extractor::with_tagger(Arc::new(RemoteTagger::new(url.clone()))),
        None => Extractor::pattern_only(),
    };

    let engine = Arc::new(RetrievalEngine::new(
        Arc::new(store),
        extractor,
        config.engine.to_engine_config(),
    ));

    let state = AppState {
        engine,
        metrics: Metrics::new(),
        cache: Arc::new(QueryCache::new(
            config.cache.max_entries,
            std::time::Duration::from_secs(config.cache.ttl_secs),
        )),
        cache_enabled: config.cache.enabled,
    };

    let app = Router::new()
        .route("/api/rag/graph/query", post(graph_query))
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "graph retrieval API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn graph_query(
    State(state): State<AppState>,
    Json(request): Json<RetrievalRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let key = QueryCache::key_for(&request);
    if state.cache_enabled {
        if let Some(cached) = state.cache.get(&key) {
            debug!(%request_id, "serving graph query from cache");
            let results = cached
                .get("results")
                .and_then(|r| r.as_array())
                .map_or(0, |r| r.len());
            state.metrics.record_query(started.elapsed(), results, true);
            return Ok(Json(cached));
        }
    }

    match state.engine.retrieve(&request).await {
        Ok(response) => {
            state
                .metrics
                .record_query(started.elapsed(), response.results.len(), true);
            let value = serde_json::to_value(&response).map_err(|e| {
                ApiError::internal(format!("failed to encode response: {e}"))
            })?;
            if state.cache_enabled {
                state.cache.set(key, value.clone());
            }
            Ok(Json(value))
        }
        Err(e) => {
            warn!(%request_id, error = %e, "graph query failed");
            state.metrics.record_query(started.elapsed(), 0, false);
            Err(ApiError::from(e))
        }
    }
}

async fn health(State(state): State<AppState>) -> Response {
    match state.engine.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"neo4j": "connected"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"neo4j": "unreachable"})),
            )
                .into_response()
        }
    }
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn cache_stats(State(state): State<AppState>) -> Json<cache::CacheStats> {
    Json(state.cache.stats())
}

async fn cache_clear(State(state): State<AppState>) -> StatusCode {
    state.cache.clear();
    StatusCode::NO_CONTENT
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        let status = match &e {
            RetrievalError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Retryable service-side failures.
            RetrievalError::GraphUnavailable(_) | RetrievalError::AllStrategiesTimedOut => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
