//! Evidence formatting from retrieved documents

use crate::models::EvidenceMatch;
use crate::rag::RetrievalResult;

/// Separator placed between documents in the inline evidence block
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Formatted evidence for one retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// The knowledge base returned nothing above the score threshold
    None,
    Found {
        /// Documents in retrieval order, scores at full precision
        documents: String,
        /// Markdown table of sources, highest score first
        sources_table: String,
    },
}

impl Evidence {
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Formatter for turning search matches into prompt text
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceFormatter;

impl EvidenceFormatter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Format a retrieval result; a pure function of its input
    #[must_use]
    pub fn format(&self, result: &RetrievalResult) -> Evidence {
        if result.is_empty() {
            return Evidence::None;
        }

        Evidence::Found {
            documents: self.format_documents(&result.matches),
            sources_table: self.format_sources_table(result),
        }
    }

    /// Inline evidence block, keeping the order the search service returned
    #[must_use]
    pub fn format_documents(&self, matches: &[EvidenceMatch]) -> String {
        matches
            .iter()
            .map(|m| {
                format!(
                    "Source: {}\nScore: {}\n\n{}",
                    m.identifier(),
                    m.score,
                    m.joined_text()
                )
            })
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR)
    }

    /// Markdown sources table sorted by score, descending
    #[must_use]
    pub fn format_sources_table(&self, result: &RetrievalResult) -> String {
        let mut table = String::from("| Filename | Score |\n|----------|-------|");
        for m in result.by_score_desc() {
            table.push_str(&format!("\n| {} | {:.3} |", m.identifier(), m.score));
        }
        table
    }
}
