use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Zero is treated as one.
    pub max_attempts: u32,

    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(100))
    }
}

/// Runs `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the attempt budget is spent. The last error is returned as is.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut, R>(policy: RetryPolicy, is_retryable: R, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                debug!(attempt, max_attempts, error = %e, "attempt failed, retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
