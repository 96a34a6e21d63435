//! # docchat-runner
//!
//! Chat orchestration: answer a message from retrieved passages and the
//! conversation's history, streaming the model's reply back incrementally.
//!
//! ## Overview
//!
//! - [`ChatOrchestrator`] - runs one request per [`chat`](ChatOrchestrator::chat) call
//! - [`ChatResponse`] - the caller's stream of [`ChatEvent`]s, cancellable and observable
//! - [`RequestState`] - `Received → Retrieving → MemoryLoaded → RequestingCompletion → Streaming → Completed`
//! - [`ChatConfig`] - top-K, per-stage timeouts, retry policy, system instruction
//! - [`build_request`] - prompt assembly
//!
//! Retrieval and completion start are retried with exponential backoff on
//! transient failures. Once chunks have been forwarded, failures end the
//! request. Memory is written only after a complete answer.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompt;
mod retry;
pub mod state;
pub mod stream;

pub use config::{ChatConfig, ChatConfigBuilder, RetryPolicy};
pub use error::{ChatError, Result};
pub use orchestrator::{ChatOrchestrator, ChatOrchestratorBuilder};
pub use prompt::{DEFAULT_SYSTEM_INSTRUCTION, build_request};
pub use state::RequestState;
pub use stream::{ChatEvent, ChatResponse};
