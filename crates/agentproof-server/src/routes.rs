//! Router for the AgentProof API

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dto::HealthResponse;
use crate::handlers::{self, AppState};

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // SDKs may call from the browser
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/keys", get(handlers::list_keys))
        .route("/api/v1/proof/create", post(handlers::create_proof))
        .route("/api/v1/proof/verify", post(handlers::verify_proof))
        .route("/api/v1/dns/resolve", get(handlers::resolve))
        .route("/api/v1/dns/register", post(handlers::register))
        .route("/api/v1/dns/revoke", post(handlers::revoke))
        .route("/api/v1/credentials", post(handlers::register_credential))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
