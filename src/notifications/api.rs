//! Public API for event delivery
//!
//! External modules should import from here rather than directly from the
//! internal modules.

pub use crate::notifications::error::NotificationError;
pub use crate::notifications::event::ChangeEvent;
pub use crate::notifications::sinks::{
    ChannelSink, FanoutSink, JsonLinesFileSink, StdoutSink, WebhookSink,
};
pub use crate::notifications::traits::{EventSink, SinkStatistics};
