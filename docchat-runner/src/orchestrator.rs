//! The chat request pipeline: retrieve, load memory, stream, commit.

use std::sync::Arc;

use docchat_memory::{MemoryStore, Message};
use docchat_model::{CompletionBackend, ModelError};
use docchat_rag::{RagError, Retriever};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::prompt::build_request;
use crate::retry::{StageError, run_stage};
use crate::state::RequestState;
use crate::stream::{ChatEvent, ChatResponse};

const EVENT_BUFFER: usize = 64;

/// Answers chat messages with retrieved context and conversation memory.
///
/// Each call to [`chat`](Self::chat) runs on its own task and walks the
/// [`RequestState`] machine. The exchange is written to memory only once the
/// backend has finished streaming, and only if the request was not cancelled.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = ChatOrchestrator::builder()
///     .retriever(retriever)
///     .memory(Arc::new(InMemoryMemoryStore::default()))
///     .backend(Arc::new(OllamaClient::new(DEFAULT_BASE_URL, "llama3")))
///     .build()?;
///
/// let answer = orchestrator.chat("c1", "Why is the sky blue?").await?.into_text().await?;
/// ```
#[derive(Clone)]
pub struct ChatOrchestrator {
    retriever: Retriever,
    memory: Arc<dyn MemoryStore>,
    backend: Arc<dyn CompletionBackend>,
    config: ChatConfig,
}

impl ChatOrchestrator {
    /// Create a new [`ChatOrchestratorBuilder`].
    pub fn builder() -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::default()
    }

    /// The configuration requests run with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The store completed exchanges are written to.
    pub fn memory(&self) -> &Arc<dyn MemoryStore> {
        &self.memory
    }

    /// Start answering `message` within `conversation_id`.
    ///
    /// Returns as soon as the request is accepted; the answer arrives through
    /// the returned [`ChatResponse`].
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidParameters`] for an empty conversation id or
    /// message. Everything later is reported on the response stream.
    pub async fn chat(&self, conversation_id: &str, message: &str) -> Result<ChatResponse> {
        if conversation_id.trim().is_empty() {
            return Err(ChatError::InvalidParameters("conversation id must not be empty".into()));
        }
        if message.trim().is_empty() {
            return Err(ChatError::InvalidParameters("message must not be empty".into()));
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (state_tx, state_rx) = watch::channel(RequestState::Received);
        let cancel = CancellationToken::new();

        let exchange = Exchange {
            conversation_id: conversation_id.to_string(),
            message: message.to_string(),
            events: events_tx,
            state: state_tx,
            cancel: cancel.clone(),
        };
        let span = info_span!("chat", conversation_id = %conversation_id, backend = self.backend.name());
        tokio::spawn(self.clone().run(exchange).instrument(span));

        Ok(ChatResponse::new(conversation_id.to_string(), events_rx, state_rx, cancel))
    }

    async fn run(self, exchange: Exchange) {
        debug!("request received");
        let outcome = tokio::select! {
            biased;
            _ = exchange.cancel.cancelled() => Err(ChatError::Cancelled),
            reply = self.generate(&exchange) => reply,
        };

        match outcome {
            Ok(_) if exchange.cancel.is_cancelled() => exchange.cancelled().await,
            Ok(reply) => {
                let chars = reply.chars().count();
                self.memory
                    .append_exchange(
                        &exchange.conversation_id,
                        Message::user(exchange.message.clone()),
                        Message::assistant(reply),
                    )
                    .await;
                exchange.transition(RequestState::Completed);
                info!(chars, "chat request completed");
                let _ = exchange.events.send(ChatEvent::Completed).await;
            }
            Err(ChatError::Cancelled) => exchange.cancelled().await,
            Err(e) => {
                exchange.transition(RequestState::Failed);
                warn!(code = e.code(), error = %e, "chat request failed");
                let _ = exchange.events.send(ChatEvent::Failed(e)).await;
            }
        }
    }

    /// Everything up to the end of the backend stream. Dropping this future
    /// drops the backend stream with it.
    async fn generate(&self, exchange: &Exchange) -> Result<String> {
        let config = &self.config;

        exchange.transition(RequestState::Retrieving);
        let retriever = &self.retriever;
        let message = exchange.message.as_str();
        let top_k = config.top_k;
        let passages = run_stage(
            "retrieval",
            config.retrieval_timeout,
            &config.retry,
            RagError::is_retryable,
            move || retriever.retrieve(message, top_k),
        )
        .await
        .map_err(|e| match e {
            StageError::TimedOut => {
                ChatError::Timeout { stage: "retrieval", timeout: config.retrieval_timeout }
            }
            StageError::Failed(e) => ChatError::RetrievalFailed(e),
        })?;
        debug!(passages = passages.len(), "retrieved context");

        let history = self.memory.get(&exchange.conversation_id).await;
        exchange.transition(RequestState::MemoryLoaded);
        debug!(history = history.len(), "loaded conversation memory");

        exchange.transition(RequestState::RequestingCompletion);
        let mut request =
            build_request(&config.system_instruction, &passages, &history, &exchange.message);
        request.temperature = config.temperature;
        let request = &request;
        let backend = self.backend.as_ref();
        let mut stream = run_stage(
            "completion",
            config.completion_timeout,
            &config.retry,
            ModelError::is_retryable,
            move || backend.stream(request.clone()),
        )
        .await
        .map_err(|e| match e {
            StageError::TimedOut => {
                ChatError::Timeout { stage: "completion", timeout: config.completion_timeout }
            }
            StageError::Failed(e) => ChatError::CompletionFailed(e),
        })?;

        exchange.transition(RequestState::Streaming);
        let mut reply = String::new();
        loop {
            let next = tokio::time::timeout(config.stream_idle_timeout, stream.next())
                .await
                .map_err(|_| ChatError::Timeout {
                    stage: "stream",
                    timeout: config.stream_idle_timeout,
                })?;
            match next {
                Some(Ok(chunk)) => {
                    reply.push_str(&chunk);
                    if exchange.events.send(ChatEvent::Chunk(chunk)).await.is_err() {
                        return Err(ChatError::Cancelled);
                    }
                }
                Some(Err(e)) => return Err(ChatError::CompletionFailed(e)),
                None => break,
            }
        }
        Ok(reply)
    }
}

/// Per-request plumbing shared by the pipeline stages.
struct Exchange {
    conversation_id: String,
    message: String,
    events: mpsc::Sender<ChatEvent>,
    state: watch::Sender<RequestState>,
    cancel: CancellationToken,
}

impl Exchange {
    fn transition(&self, next: RequestState) {
        let previous = self.state.send_replace(next);
        debug!(from = %previous, to = %next, "state transition");
    }

    async fn cancelled(&self) {
        self.transition(RequestState::Cancelled);
        info!("chat request cancelled");
        let _ = self.events.send(ChatEvent::Failed(ChatError::Cancelled)).await;
    }
}

/// Builder for [`ChatOrchestrator`].
#[derive(Default)]
pub struct ChatOrchestratorBuilder {
    retriever: Option<Retriever>,
    memory: Option<Arc<dyn MemoryStore>>,
    backend: Option<Arc<dyn CompletionBackend>>,
    config: Option<ChatConfig>,
}

impl ChatOrchestratorBuilder {
    /// Set the passage retriever.
    pub fn retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set the conversation memory.
    pub fn memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set the completion backend.
    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the configuration. Defaults to [`ChatConfig::default`].
    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the [`ChatOrchestrator`].
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidParameters`] if a component is missing or the
    /// configuration does not validate.
    pub fn build(self) -> Result<ChatOrchestrator> {
        let retriever = self
            .retriever
            .ok_or_else(|| ChatError::InvalidParameters("retriever is required".into()))?;
        let memory =
            self.memory.ok_or_else(|| ChatError::InvalidParameters("memory is required".into()))?;
        let backend = self
            .backend
            .ok_or_else(|| ChatError::InvalidParameters("backend is required".into()))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(ChatOrchestrator { retriever, memory, backend, config })
    }
}
