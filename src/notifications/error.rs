//! Error types for event delivery

use std::fmt;

#[derive(Debug, Clone)]
pub enum NotificationError {
    /// The receiving half of an in-process channel is gone
    ChannelClosed(String),
    /// Writing to stdout or a file failed
    Io { target: String, message: String },
    /// A webhook call failed or was rejected
    Http {
        url: String,
        status: Option<u16>,
        message: String,
    },
    /// The event could not be encoded
    Serialization(String),
    /// No sink of a fan-out accepted the event
    DeliveryFailed { failed_sinks: Vec<String> },
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::ChannelClosed(id) => {
                write!(f, "Channel closed for sink: {id}")
            }
            NotificationError::Io { target, message } => {
                write!(f, "Failed to write event to {target}: {message}")
            }
            NotificationError::Http {
                url,
                status: Some(status),
                message,
            } => write!(f, "Webhook {url} answered HTTP {status}: {message}"),
            NotificationError::Http {
                url,
                status: None,
                message,
            } => write!(f, "Webhook {url} unreachable: {message}"),
            NotificationError::Serialization(msg) => {
                write!(f, "Failed to serialize event: {msg}")
            }
            NotificationError::DeliveryFailed { failed_sinks } => {
                write!(
                    f,
                    "Event delivery failed for {} sink(s): {:?}",
                    failed_sinks.len(),
                    failed_sinks
                )
            }
        }
    }
}

impl std::error::Error for NotificationError {}

impl crate::core::error_handling::ContextualError for NotificationError {
    fn is_user_actionable(&self) -> bool {
        false // All delivery errors are system-level
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
