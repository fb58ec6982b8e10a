//! HTTP client for the AutoRAG knowledge base search API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::errors::RagChatError;
use crate::errors::Result;
use crate::models::EvidenceMatch;
use crate::rag::retriever::DocumentSearch;
use crate::rag::retriever::SearchOptions;

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_num_results: usize,
    rewrite_query: bool,
    ranking_options: RankingOptions,
}

#[derive(Serialize)]
struct RankingOptions {
    score_threshold: f64,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<SearchPage>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<EvidenceMatch>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| match e.code {
            Some(code) => format!("{code}: {}", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client for a single AutoRAG knowledge base
pub struct AutoRagClient {
    client: Client,
    endpoint: String,
    account_id: String,
    rag_name: String,
    api_token: Option<String>,
}

impl AutoRagClient {
    /// Create a new search client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(
        endpoint: String,
        account_id: String,
        rag_name: String,
        api_token: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            account_id,
            rag_name,
            api_token,
        })
    }

    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        let api_token = Some(config.api_token.clone()).filter(|t| !t.is_empty());
        Self::new(
            config.endpoint.clone(),
            config.account_id.clone(),
            config.rag_name.clone(),
            api_token,
        )
    }

    /// Search endpoint URL for the configured knowledge base
    pub fn search_url(&self) -> String {
        format!(
            "{}/accounts/{}/autorag/rags/{}/search",
            self.endpoint.trim_end_matches('/'),
            self.account_id,
            self.rag_name
        )
    }
}

#[async_trait]
impl DocumentSearch for AutoRagClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<EvidenceMatch>> {
        let url = self.search_url();
        debug!("Calling AutoRAG search API: {}", url);

        let request = SearchRequest {
            query,
            max_num_results: options.max_num_results,
            rewrite_query: options.rewrite_query,
            ranking_options: RankingOptions {
                score_threshold: options.score_threshold,
            },
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RagChatError::Retrieval(format!("AutoRAG request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagChatError::Retrieval(format!(
                "AutoRAG API error ({status}): {error_text}"
            )));
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| RagChatError::Retrieval(format!("Failed to parse response: {e}")))?;

        if !envelope.success {
            return Err(RagChatError::Retrieval(format!(
                "AutoRAG search failed: {}",
                describe_errors(&envelope.errors)
            )));
        }

        Ok(envelope.result.map(|page| page.data).unwrap_or_default())
    }
}
