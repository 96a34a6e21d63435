//! Ollama chat client streaming from `POST /api/chat`.
//!
//! Ollama answers a streaming chat request with newline-delimited JSON; each
//! line carries a `message.content` fragment and the last one has
//! `"done": true`.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::backend::{CompletionBackend, CompletionRequest, CompletionStream, PromptMessage};
use crate::error::{ModelError, Result};

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const PROVIDER: &str = "ollama";

/// Ollama client for a single chat model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, model)
    }

    /// Like [`new`](Self::new) but reuses an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Outcome of parsing one NDJSON line.
#[derive(Debug, PartialEq)]
enum Line {
    Text(String),
    Done(String),
    Skip,
}

fn parse_line(line: &[u8]) -> Result<Line> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(Line::Skip);
    }
    let chunk: ChatChunk = serde_json::from_slice(line).map_err(|e| ModelError::Stream {
        provider: PROVIDER.into(),
        message: format!("malformed chunk: {e}"),
    })?;
    if let Some(message) = chunk.error {
        return Err(ModelError::Stream { provider: PROVIDER.into(), message });
    }
    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok(if chunk.done { Line::Done(text) } else { Line::Text(text) })
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: true,
            options: request.temperature.map(|temperature| ChatOptions { temperature }),
        };

        debug!(model = %self.model, messages = request.messages.len(), "sending chat request");
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ModelError::BackendUnavailable {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            let message = format!("API returned {status}: {detail}");
            return Err(if status.is_client_error() {
                ModelError::Rejected { provider: PROVIDER.into(), message }
            } else {
                ModelError::BackendUnavailable { provider: PROVIDER.into(), message }
            });
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut done = false;
            'read: while let Some(next) = bytes.next().await {
                let next = next.map_err(|e| ModelError::Stream {
                    provider: PROVIDER.into(),
                    message: format!("connection interrupted: {e}"),
                })?;
                buffer.extend_from_slice(&next);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    match parse_line(&line)? {
                        Line::Text(text) if !text.is_empty() => {
                            yield text;
                        }
                        Line::Done(text) => {
                            if !text.is_empty() {
                                yield text;
                            }
                            done = true;
                            break 'read;
                        }
                        _ => {}
                    }
                }
            }
            if !done {
                match parse_line(&buffer)? {
                    Line::Done(text) => {
                        if !text.is_empty() {
                            yield text;
                        }
                        done = true;
                    }
                    Line::Text(text) if !text.is_empty() => {
                        yield text;
                    }
                    _ => {}
                }
            }
            // A body cut off before the final `done` line is not a complete answer.
            if !done {
                warn!(provider = PROVIDER, "chat stream ended without a done marker");
                Err::<(), _>(ModelError::Stream {
                    provider: PROVIDER.into(),
                    message: "stream ended before done".into(),
                })?;
            }
        };

        Ok(Box::pin(stream))
    }
}
