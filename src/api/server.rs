//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::warn;

use crate::api::handlers::AppState;
use crate::api::handlers::{
    self,
};
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::ChatOrchestrator;
use crate::Result;

/// Build the application router.
///
/// Paths under `/api/` go to the API routes; every other path (including a
/// bare `/api`) is served from `assets_dir` when given, and is a 404 otherwise.
pub fn build_router(state: AppState, enable_cors: bool, assets_dir: Option<&str>) -> Router {
    let mut app = routes::api_routes(state);

    app = match assets_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.fallback(handlers::not_found),
    };

    app = app.layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server
///
/// Binds to `server.host:server.port`; command line overrides are applied to
/// the config before calling this.
pub async fn serve_api(config: &AppConfig) -> Result<()> {
    info!("🚀 Starting ragchat API server...");

    let orchestrator = Arc::new(ChatOrchestrator::from_config(config)?);
    info!("📚 Knowledge base: {}", config.rag_name());
    info!("🤖 Model: {}", config.model());

    let state = AppState { orchestrator };

    let enable_cors = config.server.enable_cors;
    let assets_dir = config.server.assets_dir.clone().filter(|dir| {
        let exists = std::path::Path::new(dir).is_dir();
        if !exists {
            warn!("Assets directory {} not found, static files disabled", dir);
        }
        exists
    });

    if enable_cors {
        info!("✅ CORS enabled");
    }

    let app = build_router(state, enable_cors, assets_dir.as_deref());

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health - Health check");
    info!("  POST /api/chat   - Retrieval-augmented chat (streaming)");
    if let Some(dir) = &assets_dir {
        info!("  GET  /*          - Static assets from {}", dir);
    }

    axum::serve(listener, app).await?;

    Ok(())
}
