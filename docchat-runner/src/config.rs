//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::prompt::DEFAULT_SYSTEM_INSTRUCTION;

/// Exponential backoff for transient backend failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later one.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    /// No retries.
    pub fn none() -> Self {
        Self { max_attempts: 1, initial_backoff: Duration::ZERO }
    }

    /// Delay after failed attempt `attempt` (1-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

/// Settings for [`ChatOrchestrator`](crate::ChatOrchestrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Passages retrieved per question.
    pub top_k: usize,
    /// Limit for one retrieval attempt.
    pub retrieval_timeout: Duration,
    /// Limit for the backend to accept a completion request.
    pub completion_timeout: Duration,
    /// Longest allowed gap between two streamed chunks.
    pub stream_idle_timeout: Duration,
    /// Retries for retrieval and completion start.
    pub retry: RetryPolicy,
    /// Leading instruction of every prompt.
    pub system_instruction: String,
    /// Sampling temperature passed to the backend, if any.
    pub temperature: Option<f32>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            retrieval_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(30),
            stream_idle_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            temperature: None,
        }
    }
}

impl ChatConfig {
    /// Create a builder starting from the defaults.
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Check that counts and limits are non-zero.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidParameters`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ChatError::InvalidParameters("top_k must be greater than 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ChatError::InvalidParameters(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        for (name, timeout) in [
            ("retrieval_timeout", self.retrieval_timeout),
            ("completion_timeout", self.completion_timeout),
            ("stream_idle_timeout", self.stream_idle_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ChatError::InvalidParameters(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

/// Builder for [`ChatConfig`].
#[derive(Debug, Default)]
pub struct ChatConfigBuilder {
    config: ChatConfig,
}

impl ChatConfigBuilder {
    /// Set how many passages are retrieved per question.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    /// Bound one retrieval attempt.
    pub fn retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.config.retrieval_timeout = timeout;
        self
    }

    /// Bound the wait for the backend to accept a request.
    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.config.completion_timeout = timeout;
        self
    }

    /// Bound the gap between two streamed chunks.
    pub fn stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.stream_idle_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Replace the leading system instruction.
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = instruction.into();
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ChatConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
