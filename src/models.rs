use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

/// Fallback identifier for a match with neither a filename nor a file id
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    /// Missing or `null` content reads as an empty string
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// A text fragment of a retrieved document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSegment {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl ContentSegment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: text.into(),
        }
    }
}

/// A document returned by the knowledge base search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub content: Vec<ContentSegment>,
}

impl EvidenceMatch {
    pub fn new(filename: impl Into<String>, score: f64, segments: &[&str]) -> Self {
        Self {
            filename: Some(filename.into()),
            file_id: None,
            score,
            content: segments.iter().map(|s| ContentSegment::text(*s)).collect(),
        }
    }

    /// Resolve a display identifier: filename, then file id, then "Unknown"
    pub fn identifier(&self) -> &str {
        self.filename
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.file_id.as_deref().filter(|id| !id.is_empty()))
            .unwrap_or(UNKNOWN_SOURCE)
    }

    /// Text segments joined with a blank line
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
