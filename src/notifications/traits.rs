//! Traits for event delivery

use crate::notifications::error::NotificationError;
use crate::notifications::event::ChangeEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Delivery statistics kept by every sink
pub struct SinkStatistics {
    delivered: AtomicUsize,
    failed: AtomicUsize,
    last_delivery_time: RwLock<Option<Instant>>,
    last_failure_time: RwLock<Option<Instant>>,
}

impl Default for SinkStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkStatistics {
    pub fn new() -> Self {
        Self {
            delivered: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            last_delivery_time: RwLock::new(None),
            last_failure_time: RwLock::new(None),
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut time) = self.last_delivery_time.write() {
            *time = Some(Instant::now());
        }
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut time) = self.last_failure_time.write() {
            *time = Some(Instant::now());
        }
    }

    /// Record the outcome of one delivery and pass it through
    pub fn track<T>(&self, result: Result<T, NotificationError>) -> Result<T, NotificationError> {
        match &result {
            Ok(_) => self.record_delivery(),
            Err(_) => self.record_failure(),
        }
        result
    }

    pub fn last_delivery_time(&self) -> Option<Instant> {
        *self.last_delivery_time.read().ok()?
    }

    pub fn last_failure_time(&self) -> Option<Instant> {
        *self.last_failure_time.read().ok()?
    }
}

/// Downstream consumer of change events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event; an error aborts the check cycle before state is saved
    async fn create_event(&self, event: &ChangeEvent) -> Result<(), NotificationError>;

    /// Identifier used in logs
    fn sink_id(&self) -> &str;

    fn statistics(&self) -> &SinkStatistics;
}
