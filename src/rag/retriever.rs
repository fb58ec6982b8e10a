//! Query derivation and knowledge base retrieval

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use crate::errors::Result;
use crate::models::ChatMessage;
use crate::models::EvidenceMatch;
use crate::models::Role;
use crate::rag::RetrievalResult;

/// Options passed with every knowledge base search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub max_num_results: usize,
    /// Ask the search service to rewrite the query for better recall
    pub rewrite_query: bool,
    /// Matches scoring below this are dropped by the search service
    pub score_threshold: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_num_results: crate::config::default_max_num_results(),
            rewrite_query: crate::config::default_rewrite_query(),
            score_threshold: crate::config::default_score_threshold(),
        }
    }
}

/// Semantic search over a knowledge base
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Return matches in the service's relevance order
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<EvidenceMatch>>;
}

/// Retriever that turns a conversation into a knowledge base query
#[derive(Clone)]
pub struct Retriever {
    search: Arc<dyn DocumentSearch>,
    options: SearchOptions,
}

impl Retriever {
    pub fn new(search: Arc<dyn DocumentSearch>, options: SearchOptions) -> Self {
        Self { search, options }
    }

    /// Content of the most recent user message, or an empty string
    pub fn derive_query(messages: &[ChatMessage]) -> &str {
        messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map_or("", |msg| msg.content.as_str())
    }

    /// Search the knowledge base for the latest user question.
    ///
    /// Matches are returned exactly as ranked by the search service.
    pub async fn retrieve(&self, messages: &[ChatMessage]) -> Result<RetrievalResult> {
        let query = Self::derive_query(messages);
        debug!(
            "Searching knowledge base (limit {}, threshold {}): {:?}",
            self.options.max_num_results, self.options.score_threshold, query
        );

        let matches = self.search.search(query, &self.options).await?;

        info!("Knowledge base returned {} match(es)", matches.len());
        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string_pretty(&matches) {
                Ok(raw) => debug!("Search response data: {}", raw),
                Err(e) => debug!("Search response data not serializable: {}", e),
            }
        }

        Ok(RetrievalResult::new(matches))
    }
}
