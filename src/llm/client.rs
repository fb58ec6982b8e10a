//! HTTP client for the Workers AI text generation API

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use super::GenerationRequest;
use super::StreamingResponse;
use super::TextGenerator;
use crate::config::GenerationConfig;
use crate::errors::RagChatError;
use crate::errors::Result;
use crate::models::ChatMessage;

#[derive(Serialize)]
struct RunRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

/// Client for running chat models on Workers AI
pub struct WorkersAiClient {
    client: Client,
    endpoint: String,
    account_id: String,
    api_token: Option<String>,
}

impl WorkersAiClient {
    /// Create a new generation client
    ///
    /// No total request timeout is set: the response body is a stream that
    /// lives as long as the model keeps producing tokens.
    pub fn new(endpoint: String, account_id: String, api_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            account_id,
            api_token,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_token = Some(config.api_token.clone()).filter(|t| !t.is_empty());
        Self::new(config.endpoint.clone(), config.account_id.clone(), api_token)
    }

    /// Run endpoint URL for a model such as `@cf/meta/llama-3.3-70b-instruct-fp8-fast`
    pub fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.endpoint.trim_end_matches('/'),
            self.account_id,
            model.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl TextGenerator for WorkersAiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<StreamingResponse> {
        let url = self.run_url(&request.model);
        debug!("Calling Workers AI run API: {}", url);

        let body = RunRequest {
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream: request.stream,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RagChatError::Generation(format!("Workers AI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagChatError::Generation(format!(
                "Workers AI API error ({status}): {error_text}"
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        info!(
            "Generation stream opened for model {} ({} messages)",
            request.model,
            request.messages.len()
        );

        let stream = response
            .bytes_stream()
            .map_err(|e| RagChatError::Generation(format!("Stream error: {e}")));

        let streaming = StreamingResponse::new(Box::pin(stream));
        Ok(match content_type {
            Some(content_type) => streaming.with_content_type(content_type),
            None => streaming,
        })
    }
}
