//! Bounded retry with a fixed backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Sleep between a failed attempt and the next one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Succeeded { value, .. } => Ok(value),
            Self::Exhausted { error, .. } => Err(error),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Every failure except the
    /// last is logged at warn level and followed by `backoff`.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Err(error) if attempt >= max_attempts => {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: attempt,
                    }
                }
                Err(error) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %error,
                        "Attempt failed, retrying in {:?}",
                        self.backoff
                    );
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::WarnCounter;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_two_backoffs() {
        let warnings = WarnCounter::default();
        let _guard = warnings.install();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let outcome = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(format!("transient failure {attempt}"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(outcome.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(warnings.count(), 2);
        assert_eq!(outcome.into_result().unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_three_failures() {
        let warnings = WarnCounter::default();
        let _guard = warnings.install();
        let policy = RetryPolicy::default();
        let started = Instant::now();

        let outcome: RetryOutcome<(), String> = policy
            .run(|attempt| async move { Err(format!("failure {attempt}")) })
            .await;

        match outcome {
            RetryOutcome::Exhausted { error, attempts } => {
                assert_eq!(attempts, 3);
                assert_eq!(error, "failure 3");
            }
            RetryOutcome::Succeeded { .. } => panic!("should not succeed"),
        }
        // No sleep or warning after the final failure
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(warnings.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_try_success_does_not_sleep() {
        let warnings = WarnCounter::default();
        let _guard = warnings.install();
        let started = Instant::now();
        let outcome = RetryPolicy::default()
            .run(|_| async { Ok::<_, String>(7) })
            .await;
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(warnings.count(), 0);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let outcome = RetryPolicy::new(0, Duration::ZERO)
            .run(|_| async { Err::<(), _>("nope") })
            .await;
        assert_eq!(outcome.attempts(), 1);
    }
}
