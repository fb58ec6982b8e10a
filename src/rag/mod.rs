//! RAG (Retrieval-Augmented Generation) module
//!
//! This module augments a chat conversation with knowledge base evidence:
//! - Conversation normalization (leading system instruction)
//! - Query derivation and knowledge base search
//! - Evidence formatting (inline documents and a sources table)
//! - Context message assembly and injection
//! - Forwarding to the text generation service
//!
//! # Examples
//!
//! ```rust,no_run
//! use ragchat::config::AppConfig;
//! use ragchat::models::ChatMessage;
//! use ragchat::rag::ChatOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let orchestrator = ChatOrchestrator::from_config(&config)?;
//!
//!     let messages = vec![ChatMessage::user("show me the routing table")];
//!     let stream = orchestrator.chat(&messages).await?;
//!     println!("{}", stream.collect_all().await?);
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod conversation;
pub mod pipeline;
pub mod prompts;
pub mod retriever;
pub mod search_client;

pub use context::Evidence;
pub use context::EvidenceFormatter;
pub use pipeline::ChatOrchestrator;
pub use pipeline::OrchestratorSettings;
pub use prompts::PromptAssembler;
pub use retriever::DocumentSearch;
pub use retriever::Retriever;
pub use retriever::SearchOptions;
pub use search_client::AutoRagClient;

use crate::models::EvidenceMatch;

/// Matches in the order the knowledge base ranked them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub matches: Vec<EvidenceMatch>,
}

impl RetrievalResult {
    pub fn new(matches: Vec<EvidenceMatch>) -> Self {
        Self { matches }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Copy of the matches sorted by score, highest first (stable on ties)
    pub fn by_score_desc(&self) -> Vec<&EvidenceMatch> {
        let mut sorted: Vec<&EvidenceMatch> = self.matches.iter().collect();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
        sorted
    }
}

impl From<Vec<EvidenceMatch>> for RetrievalResult {
    fn from(matches: Vec<EvidenceMatch>) -> Self {
        Self::new(matches)
    }
}
