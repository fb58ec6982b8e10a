//! Structural rules for the message list sent to the model

use crate::models::ChatMessage;

/// Position of the injected context message; index 0 holds the system instruction
pub const CONTEXT_POSITION: usize = 1;

/// Return the conversation with a leading system instruction.
///
/// When no message has the system role, `default_instruction` is prepended.
/// Existing system messages are kept as-is, including duplicates.
pub fn ensure_system_instruction(
    messages: &[ChatMessage],
    default_instruction: &str,
) -> Vec<ChatMessage> {
    if messages.iter().any(ChatMessage::is_system) {
        return messages.to_vec();
    }

    let mut normalized = Vec::with_capacity(messages.len() + 1);
    normalized.push(ChatMessage::system(default_instruction));
    normalized.extend_from_slice(messages);
    normalized
}

/// Insert `context` immediately after message 0, shifting later messages right
pub fn inject_context(messages: &[ChatMessage], context: ChatMessage) -> Vec<ChatMessage> {
    let position = CONTEXT_POSITION.min(messages.len());
    let mut augmented = Vec::with_capacity(messages.len() + 1);
    augmented.extend_from_slice(&messages[..position]);
    augmented.push(context);
    augmented.extend_from_slice(&messages[position..]);
    augmented
}
