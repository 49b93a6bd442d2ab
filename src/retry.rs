// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backoff policies and bounded retry with cancellation.
//!
//! Both the sync loop and service inspection wait an exponentially growing time
//! between attempts. The delay is computed by a [`BackoffPolicy`] so tests can plug in
//! a zero-delay policy, and every wait observes the process-wide cancellation token.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Computes how long to wait before the next attempt.
pub trait BackoffPolicy: Send + Sync {
    /// Delay to apply after the attempt with zero-based index `attempt`.
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// `base * (2^attempt + 1)`, capped at `max_interval`.
///
/// With a one minute base the waits are 2m, 3m, 5m, 9m, 17m, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Base interval multiplied by the growth factor
    pub base: Duration,
    /// Upper bound for a single wait
    pub max_interval: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff with the given base and cap.
    #[must_use]
    pub fn new(base: Duration, max_interval: Duration) -> Self {
        Self { base, max_interval }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt)
            .and_then(|growth| growth.checked_add(1));

        factor
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max_interval, |delay| delay.min(self.max_interval))
    }
}

/// Sleep for `delay` unless `token` is cancelled first.
///
/// Returns `true` if the full delay elapsed, `false` on cancellation.
pub async fn sleep_or_cancelled(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Why a bounded retry gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure<E> {
    /// Every attempt failed; carries the error of the last one
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error returned by the final attempt
        last_error: E,
    },
    /// Shutdown was requested while waiting between attempts
    Cancelled,
}

/// Call `operation` up to `max_attempts` times, backing off between failures.
///
/// Returns the first success. There is no wait after the final failed attempt.
///
/// # Errors
///
/// Returns [`RetryFailure::Exhausted`] when all attempts failed and
/// [`RetryFailure::Cancelled`] when `token` fired during a wait.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    policy: &dyn BackoffPolicy,
    token: &CancellationToken,
    operation_name: &str,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %e,
                        "Retries exhausted, giving up"
                    );
                    return Err(RetryFailure::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }

                let delay = policy.next_delay(attempt - 1);
                debug!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?delay,
                    error = %e,
                    "Call failed, will retry"
                );
                if !sleep_or_cancelled(delay, token).await {
                    return Err(RetryFailure::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
