//! Router configuration for the API server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the router with all API routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(handlers::search_get))
        .route("/api/search", post(handlers::search_post))
        .route("/api/scrapers/status", get(handlers::scrapers_status))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
