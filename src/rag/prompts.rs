//! Prompt templates and context message assembly

use std::collections::HashMap;

use crate::models::ChatMessage;
use crate::rag::conversation;
use crate::rag::Evidence;

/// Instruction prepended when the caller supplies no system message
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a helpful, friendly assistant. Provide concise and accurate responses.";

/// Evidence message template; `{{documents}}` and `{{sources}}` are filled per request
pub const DEFAULT_EVIDENCE_TEMPLATE: &str = r"The following documents were retrieved from the knowledge base and may help answer the user's question. Each document has a relevance score; prioritize information from documents with higher scores.

{{documents}}

When you have finished answering, you MUST end your response with two blank lines, a horizontal rule, and then the following sources table, reproduced exactly as written:


---

{{sources}}";

/// Instruction used when the knowledge base returned nothing
pub const DEFAULT_NO_EVIDENCE_INSTRUCTION: &str = "No relevant documents were found in the knowledge base for this question. Tell the user that no knowledge base information will be used in your answer.";

/// Template for generating prompts
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template in a single pass.
    ///
    /// Substituted values are never rescanned, so a document that happens to
    /// contain `{{sources}}` is left intact. Unknown variables are kept verbatim.
    #[must_use]
    pub fn render(&self, values: &HashMap<&str, &str>) -> String {
        let mut result = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                rest = &rest[start..];
                break;
            };
            let name = &after_open[..end];
            match values.get(name) {
                Some(value) => result.push_str(value),
                None => {
                    result.push_str("{{");
                    result.push_str(name);
                    result.push_str("}}");
                }
            }
            rest = &after_open[end + 2..];
        }
        result.push_str(rest);
        result
    }

    /// Get required variables
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Extract variable names from template
fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        let name = after_open[..end].to_string();
        if !name.is_empty() && !variables.contains(&name) {
            variables.push(name);
        }
        rest = &after_open[end + 2..];
    }

    variables
}

/// Builds the context message spliced into the conversation
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    evidence_template: PromptTemplate,
    no_evidence_instruction: String,
}

impl PromptAssembler {
    pub fn new(evidence_template: impl Into<String>, no_evidence_instruction: impl Into<String>) -> Self {
        Self {
            evidence_template: PromptTemplate::new(evidence_template),
            no_evidence_instruction: no_evidence_instruction.into(),
        }
    }

    /// Build the system message describing the retrieved evidence
    #[must_use]
    pub fn context_message(&self, evidence: &Evidence) -> ChatMessage {
        match evidence {
            Evidence::Found {
                documents,
                sources_table,
            } => {
                let values = HashMap::from([
                    ("documents", documents.as_str()),
                    ("sources", sources_table.as_str()),
                ]);
                ChatMessage::system(self.evidence_template.render(&values))
            }
            Evidence::None => ChatMessage::system(self.no_evidence_instruction.clone()),
        }
    }

    /// Return the conversation with the context message at position 1
    #[must_use]
    pub fn assemble(&self, messages: &[ChatMessage], evidence: &Evidence) -> Vec<ChatMessage> {
        conversation::inject_context(messages, self.context_message(evidence))
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_EVIDENCE_TEMPLATE, DEFAULT_NO_EVIDENCE_INSTRUCTION)
    }
}
