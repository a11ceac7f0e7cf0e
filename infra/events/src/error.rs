use crate::chained::ChainedError;
use std::borrow::Cow;
use std::sync::Arc;

/// A failure raised by a subscriber, shareable between the event's scratch state
/// and the error handed back to the caller.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors produced by [`CustomEvent`](crate::CustomEvent) operations.
#[herald_derive::herald_error]
pub enum EventError {
    /// `subscribe` was called without a callback. This is a caller bug.
    #[error("Invalid subscriber{}: {message}", format_context(.context))]
    InvalidSubscriber { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The event (or one of its collaborators) was configured incorrectly.
    #[error("Invalid event configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A single subscriber failed and the failure propagates unchanged:
    /// either a FLAT subscriber aborted a fire, or a fire-once replay failed.
    #[error("Subscriber failed{}: {source}", format_context(.context))]
    Subscriber { source: SharedError, context: Option<Cow<'static, str>> },

    /// One or more LIST subscribers failed during a completed fire pass.
    #[error("{source}{}", format_context(.context))]
    Chained { source: ChainedError, context: Option<Cow<'static, str>> },
}

impl EventError {
    /// Returns the aggregated failures when this error came out of a LIST fire.
    #[must_use]
    pub const fn as_chained(&self) -> Option<&ChainedError> {
        match self {
            Self::Chained { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Consumes the error, yielding the aggregated failures if present.
    #[must_use]
    pub fn into_chained(self) -> Option<ChainedError> {
        match self {
            Self::Chained { source, .. } => Some(source),
            _ => None,
        }
    }
}
