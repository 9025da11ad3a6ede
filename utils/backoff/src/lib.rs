//! Retry-with-backoff combinator.
//!
//! [`retry`] runs a fallible async operation until it succeeds, fails
//! permanently, exhausts the backoff policy, or the shared cancellation
//! token fires. The operation classifies its own failures as transient or
//! permanent via [`RetryError`]; the combinator knows nothing about what is
//! being retried.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Exponential backoff schedule.
///
/// Each retry waits `multiplier` times longer than the previous one, capped
/// at `max_interval`. Once `max_elapsed` total time has passed the next
/// transient failure becomes terminal; `None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the second attempt.
    pub initial: Duration,

    /// Growth factor applied after every failed attempt.
    pub multiplier: f64,

    /// Upper bound on a single delay.
    pub max_interval: Duration,

    /// Total time budget across attempts.
    pub max_elapsed: Option<Duration>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl ExponentialBackoff {
    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }
}

/// Failure classification returned by the retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Retry after the next backoff delay.
    Transient(E),

    /// Stop immediately, no further attempts.
    Permanent(E),
}

/// Terminal outcome of [`retry`].
#[derive(Error, Debug)]
pub enum RetryFailure<E> {
    /// The operation failed permanently.
    #[error("permanent failure: {0}")]
    Permanent(E),

    /// The policy's time budget ran out; carries the last transient error.
    #[error("retries exhausted: {0}")]
    Exhausted(E),

    /// The cancellation token fired.
    #[error("cancelled")]
    Cancelled,
}

impl<E> RetryFailure<E> {
    /// The underlying operation error, if there was one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Permanent(e) | Self::Exhausted(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

/// Run `op` until it succeeds, classifying failures per [`RetryError`].
///
/// Cancellation is checked before every attempt and during every backoff
/// sleep; once `cancel` fires no further attempt is made.
pub async fn retry<T, E, F, Fut>(
    policy: ExponentialBackoff,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let started = Instant::now();
    let mut delay = policy.initial;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryFailure::Cancelled);
        }

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::Permanent(err)) => return Err(RetryFailure::Permanent(err)),
            Err(RetryError::Transient(err)) => err,
        };

        if let Some(max_elapsed) = policy.max_elapsed {
            if started.elapsed() + delay > max_elapsed {
                return Err(RetryFailure::Exhausted(err));
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(RetryFailure::Cancelled),
        }

        delay = policy.next_delay(delay);
    }
}
