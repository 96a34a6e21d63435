//! Prompt assembly.

use std::fmt::Write;

use docchat_memory::{ConversationMemory, Role};
use docchat_model::{CompletionRequest, PromptMessage};
use docchat_rag::SearchResult;

/// Instruction used when none is configured.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a friendly and helpful assistant. Answer the questions as accurately as possible using the provided documents. If you do not know the answer, say \"I don't know\".";

/// Build the completion request for one exchange.
///
/// The system message carries the instruction and the retrieved passages,
/// numbered in relevance order and tagged with their source document. Prior
/// conversation turns follow in order, then the new user message.
pub fn build_request(
    instruction: &str,
    passages: &[SearchResult],
    history: &ConversationMemory,
    user_message: &str,
) -> CompletionRequest {
    let mut system = String::from(instruction);
    if passages.is_empty() {
        system.push_str("\n\nNo documents matched this question.");
    } else {
        system.push_str("\n\nDocuments:");
        for (i, passage) in passages.iter().enumerate() {
            let chunk = &passage.chunk;
            let _ = write!(system, "\n\n[{}] (source: {})\n{}", i + 1, chunk.document_id, chunk.text);
        }
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::system(system));
    messages.extend(history.messages().map(|m| match m.role {
        Role::User => PromptMessage::user(m.content.clone()),
        Role::Assistant => PromptMessage::assistant(m.content.clone()),
    }));
    messages.push(PromptMessage::user(user_message));

    CompletionRequest::new(messages)
}
