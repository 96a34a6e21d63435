//! Scripted completion backend for tests and demos.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;

use crate::backend::{CompletionBackend, CompletionRequest, CompletionStream};
use crate::error::{ModelError, Result};

/// A [`CompletionBackend`] that replays a fixed list of chunks.
///
/// Every request is recorded so tests can inspect the assembled prompt.
/// Failures and delays can be injected at start-up or mid-stream, and
/// [`open_streams`](Self::open_streams) reports how many response streams are
/// still alive, which shows whether a cancelled request was actually dropped.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_model::MockCompletionBackend;
///
/// let backend = MockCompletionBackend::new(["Hello", ", ", "world"]);
/// ```
#[derive(Debug, Clone)]
pub struct MockCompletionBackend {
    chunks: Vec<String>,
    chunk_delay: Option<Duration>,
    start_delay: Option<Duration>,
    start_error: Option<ModelError>,
    fail_after: Option<(usize, ModelError)>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    open_streams: Arc<AtomicUsize>,
}

impl MockCompletionBackend {
    /// Reply with `chunks`, in order.
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            chunk_delay: None,
            start_delay: None,
            start_error: None,
            fail_after: None,
            requests: Arc::default(),
            open_streams: Arc::default(),
        }
    }

    /// Sleep before emitting each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Sleep before accepting the request.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Reject every request with `error`.
    pub fn failing(mut self, error: ModelError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Emit `count` chunks, then yield `error`.
    pub fn failing_after(mut self, count: usize, error: ModelError) -> Self {
        self.fail_after = Some((count, error));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Response streams created and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

/// Decrements the open stream counter when the stream is dropped.
struct StreamGuard(Arc<AtomicUsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionBackend for MockCompletionBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        let guard = StreamGuard(self.open_streams.clone());
        let chunks = self.chunks.clone();
        let chunk_delay = self.chunk_delay;
        let fail_after = self.fail_after.clone();

        let stream = stream! {
            let _guard = guard;
            for (i, chunk) in chunks.into_iter().enumerate() {
                if let Some((count, error)) = &fail_after {
                    if i == *count {
                        yield Err(error.clone());
                        return;
                    }
                }
                if let Some(delay) = chunk_delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk);
            }
            if let Some((_, error)) = fail_after {
                yield Err(error);
            }
        };

        Ok(Box::pin(stream))
    }
}
