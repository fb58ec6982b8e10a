//! API request handlers

use std::sync::Arc;

use axum::body::Body;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tracing::error;
use tracing::info;

use crate::api::types::ApiResponse;
use crate::api::types::ChatRequest;
use crate::api::types::ErrorResponse;
use crate::api::types::HealthResponse;
use crate::llm::streaming::EVENT_STREAM_CONTENT_TYPE;
use crate::llm::StreamingResponse;
use crate::rag::ChatOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Chat (POST /api/chat)
///
/// Every failure collapses into one generic 500 response; details go to the log.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request = ChatRequest::from_body(&body);
    info!("POST /api/chat: {} message(s)", request.messages.len());

    match state.orchestrator.chat(&request.messages).await {
        Ok(stream) => stream_response(stream),
        Err(e) => {
            error!("Error processing chat request: {}", e);
            chat_failure()
        }
    }
}

/// Method not allowed on a known API path
pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Unmatched API path
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Pass the generation stream through as the response body
fn stream_response(stream: StreamingResponse) -> Response {
    let (content_type, stream) = stream.into_parts();
    let mut response = Response::new(Body::from_stream(stream));
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

fn chat_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::chat_failure()),
    )
        .into_response()
}
