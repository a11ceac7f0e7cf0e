//! Side-channel logging for events.
//!
//! Events never call `tracing` directly; they go through a [`LogSink`] so the owner can
//! redirect or capture the stream. Silent events skip the sink entirely.

use std::fmt::Debug;
use tracing::Level;

/// Event type whose instances are always silent, so that an event used to carry log
/// records cannot log about itself.
pub const LOG_EVENT_TYPE: &str = "herald:log";

/// Destination of an event's diagnostic messages.
pub trait LogSink: Debug + Send + Sync {
    fn log(&self, message: &str, level: Level);
}

/// Forwards messages to the global `tracing` subscriber under the `herald_event` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str, level: Level) {
        if level == Level::ERROR {
            tracing::error!(target: "herald_event", "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "herald_event", "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "herald_event", "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "herald_event", "{message}");
        } else {
            tracing::trace!(target: "herald_event", "{message}");
        }
    }
}
