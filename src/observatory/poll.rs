//! Poll loop: request a scan and wait until the remote side has finished it
//!
//! - legacy API: re-request every `poll_delay` until `status_code` is 200, at
//!   most `max_poll_attempts` requests; running out fails the cycle.
//! - current API: if the first answer is PENDING, wait once and request once
//!   more; that second answer is taken as final whatever its state.

use crate::core::retry::{poll_until, PollOutcome, PollPolicy};
use crate::observatory::error::{ObservatoryError, ObservatoryResult};
use crate::observatory::requester::ScanRequester;
use crate::observatory::types::{ApiVariant, ScanResult};

/// Requests allowed for the current API: the first one plus a single retry
const CURRENT_API_ATTEMPTS: usize = 2;

/// What to do when the attempt budget runs out before a terminal answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    Fail,
    AcceptLast,
}

pub struct PollLoop<'a> {
    requester: &'a ScanRequester,
    policy: PollPolicy,
    on_exhausted: ExhaustionPolicy,
}

impl<'a> PollLoop<'a> {
    pub fn new(requester: &'a ScanRequester) -> Self {
        let config = requester.config();
        let (max_attempts, on_exhausted) = match config.variant {
            ApiVariant::LegacyV1 => (config.max_poll_attempts, ExhaustionPolicy::Fail),
            ApiVariant::CurrentV2 => (CURRENT_API_ATTEMPTS, ExhaustionPolicy::AcceptLast),
        };

        Self {
            requester,
            policy: PollPolicy {
                max_attempts,
                delay: config.poll_delay,
            },
            on_exhausted,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn exhaustion_policy(&self) -> ExhaustionPolicy {
        self.on_exhausted
    }

    /// Run until the scan is terminal and return the terminal result
    pub async fn run(&self) -> ObservatoryResult<ScanResult> {
        let config = self.requester.config();
        let variant = config.variant;
        let operation_name = format!("scan {}", config.site);

        let outcome = poll_until(
            &operation_name,
            &self.policy,
            |result: &ScanResult| variant.is_terminal(result),
            || self.requester.request(),
        )
        .await?;

        if config.debug {
            log::info!("status_code: {:?}", outcome_status(&outcome));
        }

        match (outcome, self.on_exhausted) {
            (PollOutcome::Terminal { output, attempts }, _) => {
                log::debug!("Scan of {} finished after {} request(s)", config.site, attempts);
                Ok(output)
            }
            (PollOutcome::Exhausted { output, attempts }, ExhaustionPolicy::AcceptLast) => {
                log::info!(
                    "Scan of {} still reports {} after {} request(s); using it as final",
                    config.site,
                    output.state().unwrap_or("no state"),
                    attempts
                );
                Ok(output)
            }
            (PollOutcome::Exhausted { output, attempts }, ExhaustionPolicy::Fail) => {
                Err(ObservatoryError::PollExhausted {
                    site: config.site.clone(),
                    attempts,
                    last_status: output.summary(),
                })
            }
        }
    }
}

fn outcome_status(outcome: &PollOutcome<ScanResult>) -> Option<u64> {
    match outcome {
        PollOutcome::Terminal { output, .. } | PollOutcome::Exhausted { output, .. } => {
            output.status_code()
        }
    }
}
