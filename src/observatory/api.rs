//! Observatory API
//!
//! Public surface of the watcher; other modules and the binary import from here.

pub use crate::observatory::agent::{CycleOutcome, ObservatoryAgent};
pub use crate::observatory::detector::{ChangeDetector, Decision, DecisionReason, Evaluation};
pub use crate::observatory::error::{ObservatoryError, ObservatoryResult};
pub use crate::observatory::health::{AgentHealth, HealthReport};
pub use crate::observatory::options::{AgentConfig, AgentOptions, OPTION_KEYS};
pub use crate::observatory::poll::{ExhaustionPolicy, PollLoop};
pub use crate::observatory::requester::{
    HttpReply, ReqwestTransport, ScanRequester, ScanTransport, DEFAULT_HTTP_TIMEOUT_SECS,
};
pub use crate::observatory::state::{JsonFileStateStore, MemoryStateStore, StateStore};
pub use crate::observatory::types::{ApiVariant, ScanResult};
