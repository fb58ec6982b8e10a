//! API route definitions

use axum::routing::any;
use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
///
/// Owns every path starting with `/api/`. The bare `/api` is left to the
/// caller's fallback.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health))
        // Chat endpoint; other methods get 405
        .route(
            "/api/chat",
            post(handlers::chat).fallback(handlers::method_not_allowed),
        )
        // `/*path` does not match an empty segment, so `/api/` needs its own route
        .route("/api/", any(handlers::not_found))
        .route("/api/*path", any(handlers::not_found))
        .with_state(state)
}
