//! HTTP server exposing document search

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{ParamOverrides, SearchEngine, SearchResult};

/// Search request body
#[derive(Debug, Deserialize)]
pub struct SearchRequestHttp {
    pub query: String,
    #[serde(flatten)]
    pub overrides: ParamOverrides,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub documents: usize,
}

/// Search handler. Failed searches are still 200: the failure is in the body.
async fn search_handler(
    State(engine): State<Arc<SearchEngine>>,
    Json(req): Json<SearchRequestHttp>,
) -> Result<Json<SearchResult>, (StatusCode, Json<ErrorResponse>)> {
    if req.query.trim().is_empty() {
        warn!("Rejected blank query");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Query must not be empty".to_string(),
                details: None,
            }),
        ));
    }

    info!("Received search request: query='{}'", req.query);
    let result = engine.search_with(&req.query, &req.overrides).await;
    info!(
        "Search finished: success={}, {} documents",
        result.success, result.matched_document_count
    );

    Ok(Json(result))
}

async fn health_handler(State(engine): State<Arc<SearchEngine>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "mdsearch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: engine.store().len(),
    })
}

pub fn create_router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", post(search_handler))
        .with_state(engine)
}

pub async fn run_server(engine: Arc<SearchEngine>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting mdsearch server on {}", addr);

    let app = create_router(engine);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
