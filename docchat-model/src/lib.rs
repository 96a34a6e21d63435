//! # docchat-model
//!
//! Streaming completion backends for docchat.
//!
//! ## Overview
//!
//! - [`CompletionBackend`] - send a chat prompt, get back a stream of text chunks
//! - [`OllamaClient`] - Ollama's `/api/chat` endpoint (feature `ollama`, on by default)
//! - [`MockCompletionBackend`] - scripted replies for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docchat_model::{CompletionBackend, CompletionRequest, OllamaClient, PromptMessage};
//! use futures::StreamExt;
//!
//! # async fn run() -> docchat_model::Result<()> {
//! let model = OllamaClient::new("http://localhost:11434", "llama3");
//! let mut stream = model
//!     .stream(CompletionRequest::new(vec![PromptMessage::user("Why is the sky blue?")]))
//!     .await?;
//! while let Some(chunk) = stream.next().await {
//!     print!("{}", chunk?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use backend::{CompletionBackend, CompletionRequest, CompletionStream, PromptMessage, PromptRole};
pub use error::{ModelError, Result};
pub use mock::MockCompletionBackend;
#[cfg(feature = "ollama")]
pub use ollama::OllamaClient;
