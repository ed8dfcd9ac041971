//! Liveness bookkeeping
//!
//! An agent is working when it created an event within its expected receive
//! period and has no error logged after (or shortly before) that event.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Errors this close before the last event still count as recent
pub const RECENT_ERROR_GRACE_MINUTES: i64 = 2;

// chrono::Duration::days panics past this
const MAX_PERIOD_DAYS: i64 = i64::MAX / 86_400_000;

#[derive(Debug, Default)]
pub struct AgentHealth {
    cycles: AtomicUsize,
    events_created: AtomicUsize,
    error_count: AtomicUsize,
    last_check_at: RwLock<Option<DateTime<Utc>>>,
    last_event_at: RwLock<Option<DateTime<Utc>>>,
    last_error_at: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`AgentHealth`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub working: bool,
    pub cycles: usize,
    pub events_created: usize,
    pub error_count: usize,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
}

fn stamp(slot: &RwLock<Option<DateTime<Utc>>>, at: DateTime<Utc>) {
    if let Ok(mut time) = slot.write() {
        *time = Some(at);
    }
}

fn read(slot: &RwLock<Option<DateTime<Utc>>>) -> Option<DateTime<Utc>> {
    *slot.read().ok()?
}

impl AgentHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, at: DateTime<Utc>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        stamp(&self.last_check_at, at);
    }

    pub fn record_event(&self, at: DateTime<Utc>) {
        self.events_created.fetch_add(1, Ordering::Relaxed);
        stamp(&self.last_event_at, at);
    }

    pub fn record_error(&self, at: DateTime<Utc>) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        stamp(&self.last_error_at, at);
    }

    pub fn cycles(&self) -> usize {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn events_created(&self) -> usize {
        self.events_created.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn last_check_at(&self) -> Option<DateTime<Utc>> {
        read(&self.last_check_at)
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        read(&self.last_event_at)
    }

    pub fn last_error_at(&self) -> Option<DateTime<Utc>> {
        read(&self.last_error_at)
    }

    pub fn event_created_within(&self, days: u64, now: DateTime<Utc>) -> bool {
        let days = i64::try_from(days)
            .unwrap_or(i64::MAX)
            .min(MAX_PERIOD_DAYS);
        match (self.last_event_at(), now.checked_sub_signed(Duration::days(days))) {
            (Some(last), Some(cutoff)) => last > cutoff,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn recent_error_logs(&self) -> bool {
        match (self.last_event_at(), self.last_error_at()) {
            (Some(event), Some(error)) => {
                error > event - Duration::minutes(RECENT_ERROR_GRACE_MINUTES)
            }
            _ => false,
        }
    }

    pub fn is_working(&self, expected_receive_period_in_days: u64, now: DateTime<Utc>) -> bool {
        self.event_created_within(expected_receive_period_in_days, now) && !self.recent_error_logs()
    }

    pub fn report(&self, expected_receive_period_in_days: u64, now: DateTime<Utc>) -> HealthReport {
        HealthReport {
            working: self.is_working(expected_receive_period_in_days, now),
            cycles: self.cycles(),
            events_created: self.events_created(),
            error_count: self.error_count(),
            last_check_at: self.last_check_at(),
            last_event_at: self.last_event_at(),
            last_error_at: self.last_error_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 22, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_agent_is_not_working() {
        let health = AgentHealth::new();
        assert!(!health.is_working(2, t0()));
        assert!(!health.recent_error_logs());
    }

    #[test]
    fn test_event_within_period_is_working() {
        let health = AgentHealth::new();
        health.record_event(t0());
        assert!(health.is_working(2, t0() + Duration::days(1)));
        assert!(!health.is_working(2, t0() + Duration::days(2)));
    }

    #[test]
    fn test_error_after_event_is_recent() {
        let health = AgentHealth::new();
        health.record_event(t0());
        health.record_error(t0() + Duration::hours(3));
        assert!(health.recent_error_logs());
        assert!(!health.is_working(2, t0() + Duration::hours(4)));
    }

    #[test]
    fn test_error_just_before_event_counts() {
        let health = AgentHealth::new();
        health.record_error(t0() - Duration::minutes(1));
        health.record_event(t0());
        assert!(health.recent_error_logs());
    }

    #[test]
    fn test_old_error_is_forgiven_by_new_event() {
        let health = AgentHealth::new();
        health.record_error(t0() - Duration::hours(1));
        health.record_event(t0());
        assert!(!health.recent_error_logs());
        assert!(health.is_working(2, t0() + Duration::minutes(10)));
    }

    #[test]
    fn test_report_counts() {
        let health = AgentHealth::new();
        health.record_cycle(t0());
        health.record_cycle(t0() + Duration::days(1));
        health.record_event(t0());
        health.record_error(t0() + Duration::days(1));

        let report = health.report(2, t0() + Duration::days(1));
        assert_eq!(report.cycles, 2);
        assert_eq!(report.events_created, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.last_check_at, Some(t0() + Duration::days(1)));
        assert!(!report.working);
    }
}
