//! # Busy Retry
//!
//! Re-runs a whole transactional unit when SQLite reports the database as
//! busy.
//!
//! ```text
//!   attempt 1 ──► Busy ──► sleep ~50ms ──► attempt 2 ──► Busy ──► sleep ~100ms
//!       ──► attempt 3 ──► Ok / InsufficientStock / ...   (returned as-is)
//!
//!   max_attempts reached ──► ConcurrencyBusy { attempts }
//! ```
//!
//! Only complete transactions are retried. A failed attempt has already
//! rolled back, so nothing from it is visible to the next one.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};

/// How often and how patiently to retry a busy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `1` disables retries.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up on the first busy error.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget runs out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> LedgerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match attempt().await {
                Err(err) if err.is_retryable() => {
                    if attempts >= self.max_attempts.max(1) {
                        warn!(operation, attempts, "Giving up, database still busy");
                        return Err(LedgerError::ConcurrencyBusy { attempts });
                    }

                    let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
                    warn!(
                        operation,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Database busy, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
