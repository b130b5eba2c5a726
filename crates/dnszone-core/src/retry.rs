//! Bounded retry with exponential backoff and jitter
//!
//! [`retry_with_backoff`] keeps invoking an operation until it reports that it
//! is done, or until the overall deadline passes. There is no attempt limit;
//! the deadline is the only bound.
//!
//! ```text
//! attempt ──► Done(result) ──► return result
//!    │
//!    └─► Retry ──► deadline passed? ──► Err(Timeout)
//!                       │
//!                       └─► sleep(backoff + jitter), backoff *= 2
//!                             (a sleep that crosses the deadline ends in Err(Timeout))
//! ```

use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info};

/// Outcome of one attempt, as reported by the operation
#[derive(Debug)]
pub enum Attempt<T> {
    /// Stop and hand this result to the caller, success or failure
    Done(Result<T>),
    /// Not done yet; try again after the next backoff
    Retry,
}

/// Retry timing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Overall deadline, measured from the first attempt
    pub timeout: Duration,

    /// Delay before the second attempt; doubles after every retry, uncapped
    pub initial_backoff: Duration,

    /// Upper bound (exclusive) of the uniform random delay added to each backoff
    pub max_jitter: Duration,

    /// Log a line before each backoff sleep
    pub log_retries: bool,
}

impl RetryPolicy {
    /// Create a policy with the given deadline and default timing
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            initial_backoff: Duration::from_secs(1),
            max_jitter: Duration::from_millis(250),
            log_retries: true,
        }
    }

    /// Set the first backoff interval
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Set the jitter bound; `Duration::ZERO` disables jitter
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Enable or disable retry logging
    pub fn with_logging(mut self, log_retries: bool) -> Self {
        self.log_retries = log_retries;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Run `operation` until it returns [`Attempt::Done`] or the deadline passes
///
/// # Returns
///
/// - The result carried by the first `Attempt::Done`
/// - `Err(Error::Timeout)` once the deadline has passed with the operation
///   still asking to retry. The timeout error is never produced by the
///   operation itself, so callers can tell "gave up" from "was rejected".
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    // A timeout too large to represent has no deadline
    let deadline = Instant::now().checked_add(policy.timeout);
    let mut backoff = policy.initial_backoff;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if let Attempt::Done(result) = operation().await {
            return result;
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            debug!("Deadline reached after {} attempt(s)", attempt);
            return Err(Error::Timeout(policy.timeout));
        }

        if policy.log_retries {
            info!("Trying again in {} seconds...", backoff.as_secs_f64());
        }

        let delay = backoff.saturating_add(jitter(policy.max_jitter));
        backoff = backoff.saturating_mul(2);

        let expired = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = expired => {
                debug!("Deadline reached while backing off after {} attempt(s)", attempt);
                return Err(Error::Timeout(policy.timeout));
            }
            _ = sleep(delay) => {}
        }
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}
