//! Fixed-delay retry policy for the CRM and folder stages.

use std::future::Future;
use std::time::Duration;

use crate::collaborators::CollaboratorError;
use crate::pairing::Stem;

use super::runner::{Stage, StageFailure};

/// How many times a retried stage is attempted and how long to wait
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// No delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Run `op` until it yields a value or attempts run out.
    ///
    /// Both an error and an empty result count as a failed attempt.
    pub async fn run<T, F, Fut>(
        &self,
        stem: &Stem,
        stage: Stage,
        mut op: F,
    ) -> Result<T, StageFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, CollaboratorError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => last = "no result returned".to_string(),
                Err(e) => last = e.to_string(),
            }

            if attempt < attempts {
                tracing::warn!(
                    "[pipeline] {stem}: {stage} attempt {attempt}/{attempts} failed: {last}; retrying in {:?}",
                    self.delay
                );
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
            }
        }

        Err(StageFailure::new(
            stage,
            format!("{last} (after {attempts} attempts)"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result = policy
            .run(&Stem::from("job17"), Stage::CreateRecord, |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(CollaboratorError::Unavailable("busy".to_string()))
                    } else {
                        Ok(Some(n))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<u32, _> = policy
            .run(&Stem::from("job17"), Stage::CreateFolders, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.stage, Stage::CreateFolders);
        assert!(failure.reason.contains("after 3 attempts"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }
}
