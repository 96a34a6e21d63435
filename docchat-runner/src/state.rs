use std::fmt;

use serde::Serialize;

/// Lifecycle of one chat request.
///
/// ```text
/// Received -> Retrieving -> MemoryLoaded -> RequestingCompletion -> Streaming -> Completed
/// ```
///
/// Any non-terminal state may move to `Cancelled` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Accepted, nothing started yet.
    Received,
    /// Fetching passages for the message.
    Retrieving,
    /// Passages and conversation history are in hand.
    MemoryLoaded,
    /// Waiting for the backend to accept the prompt.
    RequestingCompletion,
    /// Forwarding chunks to the caller.
    Streaming,
    /// The answer was delivered and the exchange stored.
    Completed,
    /// Stopped by the caller; nothing stored.
    Cancelled,
    /// Ended by an error; nothing stored.
    Failed,
}

impl RequestState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Cancelled | RequestState::Failed)
    }

    /// The `snake_case` name used in logs and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Received => "received",
            RequestState::Retrieving => "retrieving",
            RequestState::MemoryLoaded => "memory_loaded",
            RequestState::RequestingCompletion => "requesting_completion",
            RequestState::Streaming => "streaming",
            RequestState::Completed => "completed",
            RequestState::Cancelled => "cancelled",
            RequestState::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
