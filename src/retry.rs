//! Retry logic with exponential backoff
//!
//! [`retry_with_backoff`] re-invokes a fallible async operation according to a
//! [`RetryPolicy`]. Whether an error earns another attempt is decided by its
//! [`ErrorKind`] (see [`Classify`]) and the policy's `retry_on` set.
//!
//! # Example
//!
//! ```no_run
//! use brc_pipeline::config::RetryPolicy;
//! use brc_pipeline::retry::retry_with_backoff;
//! use brc_pipeline::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let policy = RetryPolicy::default();
//! let body = retry_with_backoff(&policy, "synoptic metadata", || async {
//!     // Your operation here
//!     Ok::<_, Error>("{}".to_string())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, ErrorKind};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub use crate::config::RetryPolicy;

/// Errors that can be sorted into an [`ErrorKind`]
pub trait Classify {
    /// The kind of this error
    fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        Error::kind(self)
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (0-indexed)
    ///
    /// `min(base_delay * exponential_base^attempt, max_delay)`, without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let max = self.max_delay.as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        if !secs.is_finite() || secs >= max {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Whether an error of this kind earns another attempt
    ///
    /// Configuration errors never do, whatever `retry_on` says.
    pub fn should_retry(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::ConfigurationInvalid && self.retry_on.contains(&kind)
    }

    /// Attempt counter driven by this policy
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempt: 0,
        }
    }
}

/// Per-operation attempt bookkeeping for a [`RetryPolicy`]
///
/// Callers that cannot hand an `FnMut` closure to [`retry_with_backoff`] (for
/// example because each attempt needs `&mut self`) drive their own loop with this.
#[derive(Debug)]
pub struct Backoff<'p> {
    policy: &'p RetryPolicy,
    attempt: u32,
}

impl Backoff<'_> {
    /// 1-based number of the attempt currently in progress
    pub fn attempt(&self) -> u32 {
        self.attempt + 1
    }

    /// Total number of attempts the policy allows (at least 1)
    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Record a failure of the current attempt
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the error
    /// must be returned to the caller (non-retryable, or attempts exhausted).
    pub fn after_failure<E>(&mut self, error: &E, operation: &str) -> Option<Duration>
    where
        E: Classify + Display,
    {
        let attempt = self.attempt();
        let max_attempts = self.max_attempts();
        let kind = error.kind();

        if !self.policy.should_retry(kind) {
            tracing::error!(
                operation,
                error = %error,
                kind = %kind,
                attempt,
                "operation failed with non-retryable error"
            );
            return None;
        }

        if attempt >= max_attempts {
            tracing::error!(
                operation,
                error = %error,
                attempts = max_attempts,
                "operation failed after all retry attempts exhausted"
            );
            return None;
        }

        let delay = self.policy.delay_for_attempt(self.attempt);
        let delay = if self.policy.jitter {
            add_jitter(delay).min(self.policy.max_delay)
        } else {
            delay
        };

        tracing::warn!(
            operation,
            error = %error,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "operation failed, retrying"
        );

        self.attempt += 1;
        Some(delay)
    }

    /// Log a success, noting how many attempts it took when retries happened
    pub fn on_success(&self, operation: &str) {
        if self.attempt > 0 {
            tracing::info!(
                operation,
                attempts = self.attempt(),
                "operation succeeded after retry"
            );
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation is called up to `policy.max_attempts` times. Retryable errors
/// (per [`RetryPolicy::should_retry`]) trigger a sleep of
/// [`RetryPolicy::delay_for_attempt`] and another call; any other error, or the
/// error from the final attempt, is returned unchanged. A successful result is
/// returned as-is.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let mut backoff = policy.backoff();

    loop {
        match operation().await {
            Ok(result) => {
                backoff.on_success(operation_name);
                return Ok(result);
            }
            Err(e) => match backoff.after_failure(&e, operation_name) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(e),
            },
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
