//! Complete chat pipeline: Normalize -> Retrieve -> Format -> Assemble -> Generate

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::llm::GenerationRequest;
use crate::llm::StreamingResponse;
use crate::llm::TextGenerator;
use crate::llm::WorkersAiClient;
use crate::models::ChatMessage;
use crate::rag::conversation;
use crate::rag::prompts;
use crate::rag::AutoRagClient;
use crate::rag::DocumentSearch;
use crate::rag::EvidenceFormatter;
use crate::rag::PromptAssembler;
use crate::rag::Retriever;
use crate::rag::SearchOptions;

/// Per-deployment values the orchestrator is built with
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub default_system_instruction: String,
    pub retrieval_result_limit: usize,
    pub score_threshold: f64,
    pub rewrite_query: bool,
    pub max_output_tokens: u32,
    pub model_identifier: String,
    pub evidence_template: String,
    pub no_evidence_instruction: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_system_instruction: config.chat.system_instruction.clone(),
            retrieval_result_limit: config.retrieval.max_num_results,
            score_threshold: config.retrieval.score_threshold,
            rewrite_query: config.retrieval.rewrite_query,
            max_output_tokens: config.generation.max_tokens,
            model_identifier: config.generation.model.clone(),
            evidence_template: config.chat.evidence_template.clone(),
            no_evidence_instruction: config.chat.no_evidence_instruction.clone(),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_num_results: self.retrieval_result_limit,
            rewrite_query: self.rewrite_query,
            score_threshold: self.score_threshold,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            default_system_instruction: prompts::DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            retrieval_result_limit: options.max_num_results,
            score_threshold: options.score_threshold,
            rewrite_query: options.rewrite_query,
            max_output_tokens: crate::config::default_max_tokens(),
            model_identifier: crate::config::default_model(),
            evidence_template: prompts::DEFAULT_EVIDENCE_TEMPLATE.to_string(),
            no_evidence_instruction: prompts::DEFAULT_NO_EVIDENCE_INSTRUCTION.to_string(),
        }
    }
}

/// Retrieval-augmented chat service.
///
/// Each call is independent: the orchestrator holds no per-conversation state
/// and can be shared across requests behind an `Arc`.
pub struct ChatOrchestrator {
    settings: OrchestratorSettings,
    retriever: Retriever,
    formatter: EvidenceFormatter,
    assembler: PromptAssembler,
    generator: Arc<dyn TextGenerator>,
}

impl ChatOrchestrator {
    /// Create an orchestrator from explicit collaborators
    pub fn new(
        settings: OrchestratorSettings,
        search: Arc<dyn DocumentSearch>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let retriever = Retriever::new(search, settings.search_options());
        let assembler = PromptAssembler::new(
            settings.evidence_template.clone(),
            settings.no_evidence_instruction.clone(),
        );

        Self {
            settings,
            retriever,
            formatter: EvidenceFormatter::new(),
            assembler,
            generator,
        }
    }

    /// Create an orchestrator talking to AutoRAG and Workers AI
    ///
    /// # Errors
    /// - HTTP client build errors
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let search = Arc::new(AutoRagClient::from_config(&config.retrieval)?);
        let generator = Arc::new(WorkersAiClient::from_config(&config.generation)?);
        Ok(Self::new(
            OrchestratorSettings::from_config(config),
            search,
            generator,
        ))
    }

    /// Build the conversation that will be sent to the model.
    ///
    /// The result holds, in order: one leading system message, the evidence
    /// context message, then every remaining caller message unchanged.
    ///
    /// # Errors
    /// - Knowledge base search failures
    pub async fn augment(&self, messages: &[ChatMessage]) -> Result<Vec<ChatMessage>> {
        // Step 1: Normalize
        let normalized =
            conversation::ensure_system_instruction(messages, &self.settings.default_system_instruction);

        // Step 2: Retrieve
        debug!("Step 2: Retrieving documents");
        let result = self.retriever.retrieve(&normalized).await?;

        // Step 3: Format evidence
        let evidence = self.formatter.format(&result);
        debug!("Evidence found: {}", evidence.is_found());

        // Step 4: Assemble context
        Ok(self.assembler.assemble(&normalized, &evidence))
    }

    /// Augment the conversation and stream the model's answer.
    ///
    /// Retrieval completes before generation starts. The returned stream is
    /// the generation service's output, untouched.
    ///
    /// # Errors
    /// - Knowledge base search failures (generation is then never called)
    /// - Generation service failures before the stream opens
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<StreamingResponse> {
        info!("Processing chat request with {} message(s)", messages.len());

        let augmented = self.augment(messages).await?;

        // Step 5: Generate
        debug!("Step 5: Forwarding {} messages to the model", augmented.len());
        let request = GenerationRequest {
            model: self.settings.model_identifier.clone(),
            messages: augmented,
            max_tokens: self.settings.max_output_tokens,
            stream: true,
        };
        self.generator.generate(request).await
    }
}
