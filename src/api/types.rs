//! API request and response types

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::models::ChatMessage;

/// Error message returned for every failed chat request
pub const CHAT_FAILURE_MESSAGE: &str = "Failed to process request";

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Chat request body
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Parse a request body; an absent or malformed body is an empty conversation
    pub fn from_body(body: &[u8]) -> Self {
        if body.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(body).unwrap_or_else(|e| {
            warn!("Ignoring malformed chat request body: {}", e);
            Self::default()
        })
    }
}

/// Error body of a failed chat request
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn chat_failure() -> Self {
        Self {
            error: CHAT_FAILURE_MESSAGE.to_string(),
        }
    }
}
