//! Async utilities and patterns
//!
//! Exponential-backoff retry for fallible async operations.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt
    pub max_retries: usize,
    /// Wait before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Factor applied to the wait after every retry
    pub backoff_multiplier: f64,
    /// Spread each wait by up to 10% in either direction
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 2000,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Upper bound on how many times the operation is invoked
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Waits that would be taken if every retry were used, in order
    pub fn delays(&self) -> Vec<Duration> {
        let mut delay = self.initial_delay_ms;
        (0..self.max_retries)
            .map(|_| {
                let current = Duration::from_millis(delay);
                delay = self.next_delay(delay);
                current
            })
            .collect()
    }

    fn next_delay(&self, delay_ms: u64) -> u64 {
        ((delay_ms as f64) * self.backoff_multiplier) as u64
    }

    fn actual_delay(&self, delay_ms: u64) -> u64 {
        if self.jitter {
            let jitter_factor = 0.1;
            let jitter = (fastrand::f64() - 0.5) * 2.0 * jitter_factor;
            ((delay_ms as f64) * (1.0 + jitter)) as u64
        } else {
            delay_ms
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: E },

    /// An attempt failed with an error that is not retried
    #[error("{0}")]
    Fatal(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal(e) => e,
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// The operation runs once, then up to `config.max_retries` more times while
/// `should_retry` accepts the error. Waits start at `initial_delay_ms` and are
/// multiplied by `backoff_multiplier` after each retry. Errors rejected by
/// `should_retry` are returned immediately without waiting.
pub async fn retry_async<F, Fut, T, E, P>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
    should_retry: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    let mut remaining = config.max_retries;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = config.max_attempts(),
            "Attempting operation"
        );

        let error = match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => error,
        };

        if !should_retry(&error) {
            debug!(
                operation = operation_name,
                attempt = attempt,
                error = %error,
                "Operation failed with non-retryable error"
            );
            return Err(RetryError::Fatal(error));
        }

        if remaining == 0 {
            error!(
                operation = operation_name,
                attempt = attempt,
                error = %error,
                "Operation failed after all retry attempts"
            );
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let wait = config.actual_delay(delay);
        warn!(
            operation = operation_name,
            attempt = attempt,
            error = %error,
            delay_ms = wait,
            "Operation failed, retrying in {} ms",
            wait
        );

        sleep(Duration::from_millis(wait)).await;

        remaining -= 1;
        delay = config.next_delay(delay);
    }
}
