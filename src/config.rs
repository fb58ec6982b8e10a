use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::rag::prompts::DEFAULT_EVIDENCE_TEMPLATE;
use crate::rag::prompts::DEFAULT_NO_EVIDENCE_INSTRUCTION;
use crate::rag::prompts::DEFAULT_SYSTEM_INSTRUCTION;
use crate::rag::prompts::PromptTemplate;

/// Environment variable overriding `retrieval.api_token`
pub const RETRIEVAL_TOKEN_ENV: &str = "RAGCHAT_RETRIEVAL_API_TOKEN";
/// Environment variable overriding `generation.api_token`
pub const GENERATION_TOKEN_ENV: &str = "RAGCHAT_GENERATION_API_TOKEN";

const CLOUDFLARE_API_ENDPOINT: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
    /// Directory of static frontend assets served for non-API paths
    #[serde(default = "default_assets_dir")]
    pub assets_dir: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8787
}

#[allow(clippy::unnecessary_wraps)]
fn default_assets_dir() -> Option<String> {
    Some("public".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: false,
            assets_dir: default_assets_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_directory")]
    pub directory: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
        }
    }
}

/// Knowledge base search (AutoRAG) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_api_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_rag_name")]
    pub rag_name: String,
    #[serde(default = "default_max_num_results")]
    pub max_num_results: usize,
    #[serde(default = "default_rewrite_query")]
    pub rewrite_query: bool,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
}

fn default_api_endpoint() -> String {
    CLOUDFLARE_API_ENDPOINT.to_string()
}

fn default_rag_name() -> String {
    "sonic-helper".to_string()
}

pub(crate) const fn default_max_num_results() -> usize {
    3
}

pub(crate) const fn default_rewrite_query() -> bool {
    true
}

pub(crate) const fn default_score_threshold() -> f64 {
    0.3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_api_endpoint(),
            account_id: String::new(),
            api_token: String::new(),
            rag_name: default_rag_name(),
            max_num_results: default_max_num_results(),
            rewrite_query: default_rewrite_query(),
            score_threshold: default_score_threshold(),
        }
    }
}

/// Text generation (Workers AI) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_api_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

pub(crate) fn default_model() -> String {
    "@cf/meta/llama-3.3-70b-instruct-fp8-fast".to_string()
}

pub(crate) const fn default_max_tokens() -> u32 {
    1024
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_api_endpoint(),
            account_id: String::new(),
            api_token: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Prompt texts used when augmenting a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    /// Template for the evidence message; must contain `{{documents}}` and `{{sources}}`
    #[serde(default = "default_evidence_template")]
    pub evidence_template: String,
    #[serde(default = "default_no_evidence_instruction")]
    pub no_evidence_instruction: String,
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_evidence_template() -> String {
    DEFAULT_EVIDENCE_TEMPLATE.to_string()
}

fn default_no_evidence_instruction() -> String {
    DEFAULT_NO_EVIDENCE_INSTRUCTION.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            evidence_template: default_evidence_template(),
            no_evidence_instruction: default_no_evidence_instruction(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            eprintln!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::RagChatError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Replace API tokens with values from the environment when present
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(RETRIEVAL_TOKEN_ENV) {
            self.retrieval.api_token = token;
        }
        if let Ok(token) = std::env::var(GENERATION_TOKEN_ENV) {
            self.generation.api_token = token;
        }
        self
    }

    /// Check values that would otherwise only fail at request time
    pub fn validate(&self) -> crate::Result<()> {
        if self.retrieval.rag_name.trim().is_empty() {
            return Err(crate::RagChatError::ConfigError(
                "retrieval.rag_name must not be empty".to_string(),
            ));
        }
        if self.retrieval.max_num_results == 0 {
            return Err(crate::RagChatError::ConfigError(
                "retrieval.max_num_results must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err(crate::RagChatError::ConfigError(format!(
                "retrieval.score_threshold must be within [0, 1], got {}",
                self.retrieval.score_threshold
            )));
        }
        if self.generation.model.trim().is_empty() {
            return Err(crate::RagChatError::ConfigError(
                "generation.model must not be empty".to_string(),
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(crate::RagChatError::ConfigError(
                "generation.max_tokens must be at least 1".to_string(),
            ));
        }
        let template = PromptTemplate::new(self.chat.evidence_template.as_str());
        for required in ["documents", "sources"] {
            if !template.variables().iter().any(|name| name == required) {
                return Err(crate::RagChatError::ConfigError(format!(
                    "chat.evidence_template is missing the {{{{{required}}}}} placeholder"
                )));
            }
        }
        Ok(())
    }

    /// Render the configuration as TOML with API tokens masked
    pub fn to_masked_toml(&self) -> crate::Result<String> {
        let mut masked = self.clone();
        masked.retrieval.api_token = mask_secret(&masked.retrieval.api_token);
        masked.generation.api_token = mask_secret(&masked.generation.api_token);
        toml::to_string_pretty(&masked)
            .map_err(|e| crate::RagChatError::ConfigError(format!("Failed to render config: {e}")))
    }

    /// Get server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get generation model identifier
    pub fn model(&self) -> &str {
        &self.generation.model
    }

    /// Get maximum output tokens per generation
    pub fn max_tokens(&self) -> u32 {
        self.generation.max_tokens
    }

    /// Get knowledge base name
    pub fn rag_name(&self) -> &str {
        &self.retrieval.rag_name
    }

    /// Get default system instruction
    pub fn system_instruction(&self) -> &str {
        &self.chat.system_instruction
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}
