//! Thin HTTP surface over the index.
//!
//! The index is built to completion before the listener is bound, so the
//! server never answers from a half-built index.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Bucket-scoped retrieval: `{ "query", "k"?, "mode"? }` |
//! | `GET`  | `/health` | Health check (returns version and chunk count) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `retrieval_failed` (500), `internal` (500).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::models::Visibility;
use crate::store::IndexStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<IndexStore>,
    default_k: usize,
}

/// Build the index, then serve it on `[server].bind` until the process exits.
///
/// Refuses to start when no embedding provider is configured.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!(
            "Cannot serve queries: embedding provider is disabled. Set [embedding] provider in config."
        );
    }

    let store = IndexStore::open(config).await?;
    store.build(&config.corpus).await?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        model = store.model_name(),
        "knowledge index listening"
    );

    axum::serve(listener, router(Arc::new(store), config.retrieval.top_k)).await?;
    Ok(())
}

/// Route table over an already-built store.
pub fn router(store: Arc<IndexStore>, default_k: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { store, default_k })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn server_error(code: &'static str, err: anyhow::Error) -> AppError {
    error!(code, error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code,
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    chunks: i64,
}

async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let stats = state
        .store
        .stats()
        .await
        .map_err(|e| server_error("internal", e))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chunks: stats.chunks,
    }))
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    results: Vec<String>,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let visibility = match req.mode.as_deref() {
        Some(mode) => mode
            .parse::<Visibility>()
            .map_err(|e| bad_request(e.to_string()))?,
        None => Visibility::default(),
    };
    let k = req.k.unwrap_or(state.default_k);

    let results = state
        .store
        .query(&req.query, k, visibility.buckets())
        .await
        .map_err(|e| server_error("retrieval_failed", e))?;

    Ok(Json(QueryResponse { results }))
}
