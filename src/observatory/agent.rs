//! The check cycle: poll, compare, emit, persist

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::core::time::{Clock, SystemClock};
use crate::notifications::api::{ChangeEvent, EventSink};
use crate::observatory::detector::{ChangeDetector, Decision};
use crate::observatory::error::{ObservatoryError, ObservatoryResult};
use crate::observatory::health::{AgentHealth, HealthReport};
use crate::observatory::options::{AgentConfig, AgentOptions};
use crate::observatory::poll::PollLoop;
use crate::observatory::requester::{ScanRequester, ScanTransport};
use crate::observatory::state::StateStore;
use crate::observatory::types::ScanResult;

/// What one successful check cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Terminal result returned by the poll loop
    pub payload: ScanResult,
    pub decision: Decision,
    /// The event handed to the sink, if any
    pub event: Option<ChangeEvent>,
}

/// One watched site with its store, sink and liveness record
pub struct ObservatoryAgent {
    config: AgentConfig,
    requester: ScanRequester,
    detector: ChangeDetector,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    health: AgentHealth,
    cycle_lock: Mutex<()>,
}

impl ObservatoryAgent {
    pub fn new(
        config: AgentConfig,
        transport: Arc<dyn ScanTransport>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            requester: ScanRequester::new(config.clone(), transport),
            detector: ChangeDetector::new(config.changes_only),
            config,
            store,
            sink,
            clock: Arc::new(SystemClock),
            health: AgentHealth::new(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Validate `options` and build the agent; fails before any request is made
    pub fn from_options(
        options: &AgentOptions,
        transport: Arc<dyn ScanTransport>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
    ) -> ObservatoryResult<Self> {
        let config = options.validate()?;
        Ok(Self::new(config, transport, store, sink))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn health(&self) -> &AgentHealth {
        &self.health
    }

    pub fn is_working(&self) -> bool {
        self.health
            .is_working(self.config.expected_receive_period_in_days, self.clock.now())
    }

    pub fn health_report(&self) -> HealthReport {
        self.health
            .report(self.config.expected_receive_period_in_days, self.clock.now())
    }

    /// Run one full check cycle against the configured store.
    ///
    /// Overlapping calls are serialized. On error nothing has been stored and
    /// no event was created.
    pub async fn check(&self) -> ObservatoryResult<CycleOutcome> {
        self.check_within(None).await
    }

    /// Like [`check`](Self::check), with the poll bounded by `poll_limit`.
    ///
    /// Only the poll can time out. Once an event has gone to the sink the
    /// cycle runs on until the state is saved.
    pub async fn check_within(
        &self,
        poll_limit: Option<Duration>,
    ) -> ObservatoryResult<CycleOutcome> {
        let _cycle = self.cycle_lock.lock().await;
        self.health.record_cycle(self.clock.now());

        let result = async {
            let last = self.store.load().await?;
            let payload = self.poll(poll_limit).await?;
            let (outcome, next_state) = self.emit(payload, last).await?;
            if outcome.decision.store {
                if let Some(next) = &next_state {
                    self.store.save(next).await?;
                }
            }
            Ok::<_, ObservatoryError>(outcome)
        }
        .await;

        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    /// Poll, compare against `last` and emit if warranted.
    ///
    /// The store is not touched; the state to persist is returned alongside
    /// the outcome.
    pub async fn check_with_state(
        &self,
        last: Option<ScanResult>,
    ) -> ObservatoryResult<(CycleOutcome, Option<ScanResult>)> {
        let payload = self.poll(None).await?;
        self.emit(payload, last).await
    }

    async fn poll(&self, limit: Option<Duration>) -> ObservatoryResult<ScanResult> {
        let poll_loop = PollLoop::new(&self.requester);
        let poll = poll_loop.run();
        let payload = match limit {
            Some(limit) => tokio::time::timeout(limit, poll)
                .await
                .map_err(|_| ObservatoryError::CycleTimeout {
                    seconds: limit.as_secs(),
                })??,
            None => poll.await?,
        };
        log::info!("Scan of {} finished: {}", self.config.site, payload.summary());
        Ok(payload)
    }

    async fn emit(
        &self,
        payload: ScanResult,
        last: Option<ScanResult>,
    ) -> ObservatoryResult<(CycleOutcome, Option<ScanResult>)> {
        let evaluation = self.detector.evaluate(payload.clone(), last);
        log::debug!(
            "Decision for {}: {:?} (emit={}, store={})",
            self.config.site,
            evaluation.decision.reason,
            evaluation.decision.emit,
            evaluation.decision.store
        );

        let event = match evaluation.event {
            Some(event_payload) => {
                let now = self.clock.now();
                let event = ChangeEvent::new(&self.config.site, self.config.variant, now, event_payload);
                self.sink.create_event(&event).await?;
                self.health.record_event(now);
                log::info!(
                    "Created event for {} via {}",
                    self.config.site,
                    self.sink.sink_id()
                );
                Some(event)
            }
            None => None,
        };

        let outcome = CycleOutcome {
            payload,
            decision: evaluation.decision,
            event,
        };
        Ok((outcome, evaluation.next_state))
    }

    /// Log a failed cycle and count it against liveness
    fn record_failure(&self, error: &ObservatoryError) {
        self.health.record_error(self.clock.now());
        log::error!("Check of {} failed: {}", self.config.site, error);
    }
}
