use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryPolicy;

/// Why a stage gave up.
#[derive(Debug)]
pub(crate) enum StageError<E> {
    TimedOut,
    Failed(E),
}

/// Run `op` under `limit`, retrying timeouts and errors accepted by
/// `is_retryable` until the policy's attempts are used up.
pub(crate) async fn run_stage<T, E, F, Fut>(
    stage: &'static str,
    limit: Duration,
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, StageError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        let error = match tokio::time::timeout(limit, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if is_retryable(&e) => StageError::Failed(e),
            Ok(Err(e)) => return Err(StageError::Failed(e)),
            Err(_) => StageError::TimedOut,
        };
        if attempt >= policy.max_attempts {
            return Err(error);
        }

        let delay = policy.backoff(attempt);
        match &error {
            StageError::TimedOut => warn!(stage, attempt, ?delay, ?limit, "stage timed out, retrying"),
            StageError::Failed(e) => warn!(stage, attempt, ?delay, error = %e, "stage failed, retrying"),
        }
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
