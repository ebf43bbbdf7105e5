//! Retry with exponential backoff.
//!
//! One helper serves both network-facing stages: the chunk uploader retries
//! every [`ApiError::is_transient`] failure, the import poller only
//! [`ApiError::is_network`] ones. The predicate decides; the policy only
//! decides how many times and how long to wait.
//!
//! With the default policy (3 attempts, 1 s base, 5 s cap) the waits are
//! 1 s → 2 s, and a fourth attempt would wait 4 s, a fifth 5 s.
//!
//! [`ApiError::is_transient`]: crate::error::ApiError::is_transient
//! [`ApiError::is_network`]: crate::error::ApiError::is_network

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How many attempts, and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Wait before attempt `attempt + 1`, given that `attempt` (1-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// Why the helper gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure<E> {
    pub error: E,
    /// Attempts actually made.
    pub attempts: u32,
    /// Stopped because the cancellation flag was raised.
    pub cancelled: bool,
}

/// Run `op` until it succeeds, fails permanently, runs out of attempts, or
/// `cancel` is raised between attempts.
///
/// `op` receives the 1-based attempt number. A failure for which
/// `is_transient` returns `false` is returned immediately.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    cancel: Option<&AtomicBool>,
    is_transient: P,
    label: &str,
    mut op: F,
) -> Result<(T, u32), RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => {
                if !is_transient(&error) || attempt >= max_attempts {
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                        cancelled: false,
                    });
                }

                let backoff = policy.delay_after(attempt);
                warn!(
                    "{}: attempt {}/{} failed: {}; retrying in {}ms",
                    label,
                    attempt,
                    max_attempts,
                    error,
                    backoff.as_millis()
                );
                sleep(backoff).await;

                if cancel.is_some_and(|c| c.load(Ordering::SeqCst)) {
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                        cancelled: true,
                    });
                }
                attempt += 1;
            }
        }
    }
}
