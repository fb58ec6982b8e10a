//! Text generation service interface

pub mod client;
pub mod streaming;

use async_trait::async_trait;

pub use client::WorkersAiClient;
pub use streaming::StreamingResponse;

use crate::errors::Result;
use crate::models::ChatMessage;

/// Everything the generation service needs for one answer
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    /// Request a live response stream instead of a buffered result
    pub stream: bool,
}

/// A service that turns a conversation into a streamed answer
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Resolves once the service has accepted the request; the body is streamed afterwards
    async fn generate(&self, request: GenerationRequest) -> Result<StreamingResponse>;
}
