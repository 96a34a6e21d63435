//! The completion backend capability and its request types.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Who authored a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// Instruction and retrieved context.
    System,
    User,
    Assistant,
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PromptRole::System => "system",
            PromptRole::User => "user",
            PromptRole::Assistant => "assistant",
        })
    }
}

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Author of the message.
    pub role: PromptRole,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: PromptRole::System, content: content.into() }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: PromptRole::User, content: content.into() }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: PromptRole::Assistant, content: content.into() }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in conversation order, system instruction first.
    pub messages: Vec<PromptMessage>,
    /// Sampling temperature; backend default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A request for `messages` with the backend's default sampling.
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self { messages, temperature: None }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Incremental text chunks in backend emission order. The stream ending
/// without an error is the end-of-response signal, so a backend must yield an
/// error when the response is cut off.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A language model that answers a chat prompt as a stream of text chunks.
///
/// Dropping the returned stream must abort the in-flight request where the
/// transport allows it.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model or backend name, for logging.
    fn name(&self) -> &str;

    /// Start a streaming completion.
    ///
    /// Resolves once the backend has accepted the request; chunks then arrive
    /// through the returned stream.
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream>;
}
