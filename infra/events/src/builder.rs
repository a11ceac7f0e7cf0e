use crate::args::Value;
use crate::callback::Callback;
use crate::error::EventError;
use crate::event::{CustomEvent, Signature};
use crate::handle::Handle;
use crate::log::LogSink;
use crate::subscription::{ContextOverride, IdAllocator};
use private::Sealed;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct EventConfig {
    pub(crate) context: Option<Value>,
    pub(crate) silent: bool,
    pub(crate) signature: Signature,
    pub(crate) fire_once: bool,
    pub(crate) ids: Option<Arc<dyn IdAllocator>>,
    pub(crate) sink: Option<Arc<dyn LogSink>>,
}

#[derive(Debug, Default)]
pub struct NoType;
#[derive(Debug)]
pub struct WithType(String);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoType {}
impl Sealed for WithType {}

/// Fluent builder for [`CustomEvent`]. The event type must be set before `build`.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct EventBuilder<S: Sealed = NoType> {
    state: S,
    config: EventConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> EventBuilder<S> {
    /// Default execution context for subscribers without an override.
    #[must_use = "The builder does nothing until .build() is called"]
    pub fn context(mut self, context: Value) -> Self {
        self.config.context = Some(context);
        self
    }

    /// Suppresses side-channel logging for this event.
    #[must_use = "The builder does nothing until .build() is called"]
    pub const fn silent(mut self, silent: bool) -> Self {
        self.config.silent = silent;
        self
    }

    #[must_use = "The builder does nothing until .build() is called"]
    pub const fn signature(mut self, signature: Signature) -> Self {
        self.config.signature = signature;
        self
    }

    /// Makes the event fire at most once and replay that fire to late subscribers.
    #[must_use = "The builder does nothing until .build() is called"]
    pub const fn fire_once(mut self, fire_once: bool) -> Self {
        self.config.fire_once = fire_once;
        self
    }

    #[must_use = "The builder does nothing until .build() is called"]
    pub fn id_allocator(mut self, ids: Arc<dyn IdAllocator>) -> Self {
        self.config.ids = Some(ids);
        self
    }

    #[must_use = "The builder does nothing until .build() is called"]
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.config.sink = Some(sink);
        self
    }
}

impl EventBuilder<NoType> {
    #[must_use = "Creates a new event builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the type identifier of the event"]
    pub fn event_type(self, event_type: impl Into<String>) -> EventBuilder<WithType> {
        EventBuilder { state: WithType(event_type.into()), config: self.config }
    }
}

impl EventBuilder<WithType> {
    /// Creates the event, along with its subscribe-notification child.
    ///
    /// # Errors
    /// Returns [`EventError::InvalidConfiguration`] if the event type is empty or blank.
    pub fn build(self) -> Result<CustomEvent, EventError> {
        if self.state.0.trim().is_empty() {
            return Err(EventError::InvalidConfiguration {
                message: "event type cannot be empty".into(),
                context: None,
            });
        }
        Ok(CustomEvent::from_config(self.state.0, self.config))
    }
}

/// Fluent form of [`CustomEvent::subscribe_with`].
#[derive(Debug)]
pub struct SubscribeBuilder<'a> {
    event: &'a CustomEvent,
    callback: Option<Callback>,
    companion: Option<Value>,
    context: ContextOverride,
}

impl<'a> SubscribeBuilder<'a> {
    pub(crate) fn new(event: &'a CustomEvent) -> Self {
        Self { event, callback: None, companion: None, context: ContextOverride::None }
    }

    #[must_use = "Nothing is subscribed until .subscribe() is called"]
    pub fn callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// A value handed back to the callback on every notification.
    #[must_use = "Nothing is subscribed until .subscribe() is called"]
    pub fn companion(mut self, companion: Value) -> Self {
        self.companion = Some(companion);
        self
    }

    #[must_use = "Nothing is subscribed until .subscribe() is called"]
    pub fn context(mut self, context: ContextOverride) -> Self {
        self.context = context;
        self
    }

    /// # Errors
    /// See [`CustomEvent::subscribe_with`].
    pub fn subscribe(self) -> Result<Handle, EventError> {
        self.event.subscribe_with(self.callback, self.companion, self.context)
    }
}
