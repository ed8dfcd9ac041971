//! Change detection between the latest terminal scan and the last stored one
//!
//! Decision table:
//!
//! | changes_only | stored vs new       | emit                                   | store |
//! |--------------|---------------------|----------------------------------------|-------|
//! | false        | equal               | yes                                    | no    |
//! | false        | different or absent | yes                                    | yes   |
//! | true         | equal               | no                                     | no    |
//! | true         | absent              | if status_code is 200                  | yes   |
//! | true         | different           | if score changed and status_code is 200| yes   |
//!
//! Results are compared as structured JSON values, so key order never matters.

use crate::observatory::types::ScanResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// changes_only is off; every terminal result is emitted
    EmitAlways,
    /// Identical to the stored result
    Unchanged,
    /// Nothing stored yet and the scan succeeded
    FirstResult,
    /// Nothing stored yet and the scan did not succeed
    FirstResultUnsuccessful,
    /// Score differs from the stored result and the scan succeeded
    ScoreChanged,
    /// Something besides the score changed, or the scan did not succeed
    NoDiff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub emit: bool,
    pub store: bool,
    pub reason: DecisionReason,
}

/// Outcome of one evaluation: what to emit and what the store should hold next
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    pub event: Option<ScanResult>,
    pub next_state: Option<ScanResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeDetector {
    changes_only: bool,
}

impl ChangeDetector {
    pub fn new(changes_only: bool) -> Self {
        Self { changes_only }
    }

    pub fn decide(&self, payload: &ScanResult, last: Option<&ScanResult>) -> Decision {
        let changed = last != Some(payload);

        if !self.changes_only {
            return Decision {
                emit: true,
                store: changed,
                reason: DecisionReason::EmitAlways,
            };
        }

        let (emit, reason) = match last {
            _ if !changed => (false, DecisionReason::Unchanged),
            None if payload.is_success() => (true, DecisionReason::FirstResult),
            None => (false, DecisionReason::FirstResultUnsuccessful),
            Some(previous) if payload.score_differs(previous) && payload.is_success() => {
                (true, DecisionReason::ScoreChanged)
            }
            Some(_) => (false, DecisionReason::NoDiff),
        };

        Decision {
            emit,
            store: changed,
            reason,
        }
    }

    /// Take the stored state in, hand the next state back
    pub fn evaluate(&self, payload: ScanResult, last: Option<ScanResult>) -> Evaluation {
        let decision = self.decide(&payload, last.as_ref());

        if decision.reason == DecisionReason::NoDiff {
            log::info!("no diff");
        }

        let event = decision.emit.then(|| payload.clone());
        let next_state = if decision.store { Some(payload) } else { last };

        Evaluation {
            decision,
            event,
            next_state,
        }
    }
}
