//! Observatory error types

use crate::core::validation::ValidationError;
use crate::notifications::api::NotificationError;

/// Everything that can abort a check cycle
#[derive(Debug, thiserror::Error)]
pub enum ObservatoryError {
    /// Agent options failed validation; raised before any request is made
    #[error("Configuration error: {0}")]
    Config(#[from] ValidationError),

    /// The HTTP request itself failed (DNS, TLS, connection, timeout)
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The API answered with something that is not a JSON object
    #[error("Malformed response (HTTP {status}): {message}")]
    MalformedResponse { status: u16, message: String },

    /// The scan API reported its database as unavailable
    #[error("Unable to connect to database: the Observatory API reported 'database-down'")]
    DatabaseDown,

    /// The scan never reached a terminal state within the attempt budget
    #[error("Scan for {site} did not finish after {attempts} attempts (last status: {last_status})")]
    PollExhausted {
        site: String,
        attempts: usize,
        last_status: String,
    },

    /// The event sink refused the event
    #[error("Event delivery failed: {0}")]
    Sink(#[from] NotificationError),

    /// Reading or writing the last-known result failed
    #[error("State store error: {message}")]
    State { message: String },

    /// The poll did not reach a terminal result within the cycle limit
    #[error("Scan poll timed out after {seconds}s")]
    CycleTimeout { seconds: u64 },
}

impl crate::core::error_handling::ContextualError for ObservatoryError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, ObservatoryError::Config(_))
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ObservatoryError::Config(err) => Some(err.message()),
            _ => None,
        }
    }
}

pub type ObservatoryResult<T> = Result<T, ObservatoryError>;
