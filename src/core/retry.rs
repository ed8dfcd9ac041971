//! Fixed-delay polling for operations that finish asynchronously on a remote side
//!
//! An operation is re-invoked until its output satisfies a terminal predicate or
//! the attempt budget runs out. Errors from the operation are never retried.

use std::time::Duration;
use tokio::time::sleep;

/// Fixed-delay polling policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total number of invocations allowed, including the first one
    pub max_attempts: usize,
    /// Wait between two invocations
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Result of a polling run
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The predicate accepted this output
    Terminal { output: T, attempts: usize },
    /// The budget ran out; this is the last output seen
    Exhausted { output: T, attempts: usize },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> usize {
        match self {
            PollOutcome::Terminal { attempts, .. } | PollOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_output(self) -> T {
        match self {
            PollOutcome::Terminal { output, .. } | PollOutcome::Exhausted { output, .. } => output,
        }
    }
}

/// Invoke `operation` until `is_terminal` accepts its output.
///
/// A `max_attempts` of zero is treated as one: the operation always runs at
/// least once.
///
/// # Examples
/// ```rust
/// use observatory_watch::core::retry::{poll_until, PollOutcome, PollPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), String> {
/// let policy = PollPolicy { max_attempts: 5, delay: Duration::from_millis(1) };
/// let outcome = poll_until("scan", &policy, |n: &u32| *n == 200, || async {
///     Ok::<u32, String>(200)
/// })
/// .await?;
/// assert!(matches!(outcome, PollOutcome::Terminal { attempts: 1, .. }));
/// # Ok(())
/// # }
/// ```
pub async fn poll_until<F, Fut, T, E, P>(
    operation_name: &str,
    policy: &PollPolicy,
    mut is_terminal: P,
    mut operation: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let output = operation().await?;

        if is_terminal(&output) {
            return Ok(PollOutcome::Terminal {
                output,
                attempts: attempt,
            });
        }

        if attempt >= max_attempts {
            log::debug!(
                "Operation '{}' still not terminal after {} attempts",
                operation_name,
                attempt
            );
            return Ok(PollOutcome::Exhausted {
                output,
                attempts: attempt,
            });
        }

        log::info!(
            "Operation '{}' not finished (attempt {}/{}), waiting {:?}",
            operation_name,
            attempt,
            max_attempts,
            policy.delay
        );
        sleep(policy.delay).await;
        attempt += 1;
    }
}
