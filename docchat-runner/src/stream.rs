//! The caller's handle on an in-flight chat request.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::{ChatError, Result};
use crate::state::RequestState;

/// One item of a chat response stream.
#[derive(Debug)]
pub enum ChatEvent {
    /// Incremental answer text, in backend emission order.
    Chunk(String),
    /// The answer is complete and the exchange was stored in memory.
    Completed,
    /// The request ended without an answer. Nothing was stored.
    Failed(ChatError),
}

impl ChatEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Chunk(_))
    }
}

/// Streamed answer to one chat message.
///
/// Yields [`ChatEvent::Chunk`]s followed by exactly one terminal event.
/// Calling [`cancel`](Self::cancel) or dropping the response aborts the
/// request; a cancelled exchange is never written to conversation memory.
pub struct ChatResponse {
    conversation_id: String,
    events: mpsc::Receiver<ChatEvent>,
    state: watch::Receiver<RequestState>,
    cancel: CancellationToken,
}

impl ChatResponse {
    pub(crate) fn new(
        conversation_id: String,
        events: mpsc::Receiver<ChatEvent>,
        state: watch::Receiver<RequestState>,
        cancel: CancellationToken,
    ) -> Self {
        Self { conversation_id, events, state, cancel }
    }

    /// The conversation this request belongs to.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The request's current state.
    pub fn state(&self) -> RequestState {
        *self.state.borrow()
    }

    /// A receiver notified on every state transition.
    pub fn state_changes(&self) -> watch::Receiver<RequestState> {
        self.state.clone()
    }

    /// Abort the request.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this request when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the stream and return the full answer.
    pub async fn into_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(event) = self.next().await {
            match event {
                ChatEvent::Chunk(chunk) => text.push_str(&chunk),
                ChatEvent::Completed => return Ok(text),
                ChatEvent::Failed(e) => return Err(e),
            }
        }
        Err(ChatError::Cancelled)
    }
}

impl Stream for ChatResponse {
    type Item = ChatEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChatEvent>> {
        self.get_mut().events.poll_recv(cx)
    }
}

impl Drop for ChatResponse {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatResponse")
            .field("conversation_id", &self.conversation_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
