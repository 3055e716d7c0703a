//! Bounded retry with fixed backoff
//!
//! Vendor generation and history lookups fail transiently; both are
//! wrapped in the same policy: a fixed number of attempts separated by a
//! fixed delay. The sleep is injectable so tests can script outcomes
//! without waiting.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Fixed-attempt, fixed-delay retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 3 attempts, 2 s apart: the bound both vendor paths use
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `op` until it succeeds or the policy is exhausted, sleeping with
/// `sleep` between attempts. The final error is returned unchanged.
pub async fn retry_with_sleep<T, F, Fut, S, SFut>(
    policy: RetryPolicy,
    mut op: F,
    sleep: S,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    S: Fn(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts.max(1) {
                    return Err(err);
                }
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, policy.max_attempts, err, policy.delay
                );
                sleep(policy.delay).await;
            }
        }
    }
}

/// [`retry_with_sleep`] with the tokio timer.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_sleep(policy, op, tokio::time::sleep).await
}
