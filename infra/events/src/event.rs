//! The custom event: subscription bookkeeping and synchronous dispatch.

use crate::args::{Args, Value, default_context, value};
use crate::builder::{EventBuilder, EventConfig, SubscribeBuilder};
use crate::callback::{Callback, Invocation, Payload, Propagation};
use crate::chained::ChainedError;
use crate::error::{EventError, EventErrorExt, SharedError};
use crate::handle::{Handle, Unsubscribe};
use crate::log::{LOG_EVENT_TYPE, LogSink, TracingSink};
use crate::subscription::{ContextOverride, IdAllocator, Subscription, SubscriptionId, shared_ids};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::Mutex;
use std::fmt::{self, Display};
use std::sync::{Arc, Weak};
use tracing::Level;

/// Type of the child event that announces new subscribers. Events of this type have no
/// child of their own.
pub const SUBSCRIBE_EVENT_TYPE: &str = "subscribe-notification";

/// Argument shape delivered to subscribers, and the error policy that goes with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Signature {
    /// `(event_type, args, companion)`. Subscriber failures are caught, logged and
    /// raised together as a [`ChainedError`] once the pass is over.
    List,
    /// The raw arguments. The first subscriber failure aborts the pass and propagates.
    #[default]
    Flat,
}

impl Signature {
    /// Whether subscriber failures are caught and aggregated instead of propagated.
    #[must_use]
    pub const fn isolates_errors(self) -> bool {
        matches!(self, Self::List)
    }
}

#[derive(Debug, Default)]
struct EventState {
    subscribers: FxHashMap<SubscriptionId, Arc<Subscription>>,
    next_ordinal: u64,
    fired: bool,
    fired_with: Option<Args>,
}

#[derive(Debug)]
pub(crate) struct EventInner {
    event_type: String,
    context: Value,
    silent: bool,
    signature: Signature,
    fire_once: bool,
    subscribe_event: Option<CustomEvent>,
    state: Mutex<EventState>,
    last_error: Mutex<Option<SharedError>>,
    ids: Arc<dyn IdAllocator>,
    sink: Arc<dyn LogSink>,
}

impl EventInner {
    /// Removes `subscription` if it is still registered here, then tombstones it.
    pub(crate) fn delete(&self, subscription: &Arc<Subscription>) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let registered = state
                .subscribers
                .get(&subscription.id())
                .is_some_and(|current| Arc::ptr_eq(current, subscription));
            registered && state.subscribers.remove(&subscription.id()).is_some()
        };
        removed && subscription.tombstone()
    }
}

/// Weak back-reference to an event. It is the context of every subscribe-notification
/// event, pointing at the event whose subscribers are being announced.
#[derive(Debug, Clone)]
pub struct EventRef(Weak<EventInner>);

impl EventRef {
    #[must_use]
    pub fn upgrade(&self) -> Option<CustomEvent> {
        self.0.upgrade().map(|inner| CustomEvent { inner })
    }
}

/// What a single notification produced.
struct Notified {
    propagation: Propagation,
    error: Option<SharedError>,
}

impl Notified {
    const SKIPPED: Self = Self { propagation: Propagation::Continue, error: None };
}

/// A named event that subscribers attach to and that is fired synchronously.
///
/// Cloning is cheap and yields another handle to the same event.
///
/// # Example
///
/// ```rust
/// use herald_event::{Callback, CustomEvent, EventError, Signature, args};
///
/// # fn main() -> Result<(), EventError> {
/// let saved = CustomEvent::builder().event_type("saved").signature(Signature::List).build()?;
///
/// let audit = Callback::new(|inv| {
///     assert_eq!(inv.event_type(), Some("saved"));
///     assert_eq!(inv.args().get::<u64>(0), Some(&42));
/// });
/// let handle = saved.subscribe(audit)?;
///
/// assert!(saved.fire(args![42_u64])?);
/// assert!(handle.detach());
/// assert!(!saved.has_subscribers());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CustomEvent {
    inner: Arc<EventInner>,
}

impl CustomEvent {
    #[must_use = "The event is not created until you call .build()"]
    pub fn builder() -> EventBuilder {
        EventBuilder::new()
    }

    /// Creates a FLAT event with the default context.
    ///
    /// # Errors
    /// Returns [`EventError::InvalidConfiguration`] if `event_type` is blank.
    pub fn new(event_type: impl Into<String>) -> Result<Self, EventError> {
        Self::builder().event_type(event_type).build()
    }

    pub(crate) fn from_config(event_type: String, config: EventConfig) -> Self {
        let silent = config.silent || event_type == LOG_EVENT_TYPE;
        let ids = config.ids.unwrap_or_else(shared_ids);
        let sink = config.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let context = config.context.unwrap_or_else(default_context);

        let inner = Arc::new_cyclic(|weak: &Weak<EventInner>| {
            let subscribe_event = (event_type != SUBSCRIBE_EVENT_TYPE).then(|| {
                Self::from_config(
                    SUBSCRIBE_EVENT_TYPE.to_owned(),
                    EventConfig {
                        context: Some(value(EventRef(weak.clone()))),
                        silent: true,
                        ids: Some(Arc::clone(&ids)),
                        sink: Some(Arc::clone(&sink)),
                        ..EventConfig::default()
                    },
                )
            });

            EventInner {
                event_type,
                context,
                silent,
                signature: config.signature,
                fire_once: config.fire_once,
                subscribe_event,
                state: Mutex::new(EventState::default()),
                last_error: Mutex::new(None),
                ids,
                sink,
            }
        });

        let event = Self { inner };
        event.log(Level::DEBUG, || format!("Creating {event}"));
        event
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.inner.event_type
    }

    #[must_use]
    pub fn context(&self) -> &Value {
        &self.inner.context
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.inner.silent
    }

    #[must_use]
    pub fn signature(&self) -> Signature {
        self.inner.signature
    }

    #[must_use]
    pub fn is_fire_once(&self) -> bool {
        self.inner.fire_once
    }

    /// `true` once a fire pass has completed (including veto-terminated passes).
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.inner.state.lock().fired
    }

    /// Arguments of the completed fire of a fire-once event.
    #[must_use]
    pub fn fired_with(&self) -> Option<Args> {
        self.inner.state.lock().fired_with.clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// The failure captured by the most recent LIST notification, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<SharedError> {
        self.inner.last_error.lock().clone()
    }

    /// The child event fired before every new subscription is registered. Its arguments
    /// are the subscribe arguments: the [`Callback`], the companion as `Option<Value>`,
    /// and the [`ContextOverride`]. Its context is an [`EventRef`] to this event.
    ///
    /// `None` only for subscribe-notification events themselves.
    #[must_use]
    pub fn subscribe_event(&self) -> Option<&Self> {
        self.inner.subscribe_event.as_ref()
    }

    /// Subscribes `callback` with no companion and the event's context.
    ///
    /// # Errors
    /// See [`CustomEvent::subscribe_with`].
    pub fn subscribe(&self, callback: Callback) -> Result<Handle, EventError> {
        self.subscribe_with(Some(callback), None, ContextOverride::None)
    }

    /// Starts a fluent subscription.
    #[must_use = "Nothing is subscribed until .subscribe() is called"]
    pub fn subscriber(&self) -> SubscribeBuilder<'_> {
        SubscribeBuilder::new(self)
    }

    /// Registers a subscriber.
    ///
    /// Subscribe-notification listeners are fired first and do not see the new
    /// subscription yet. On a fire-once event that already fired, the new subscriber is
    /// notified immediately with the stored arguments before it is registered.
    ///
    /// # Errors
    /// - [`EventError::InvalidSubscriber`] when `callback` is `None`.
    /// - Any error raised by a subscribe-notification listener.
    /// - [`EventError::Subscriber`] when the fire-once replay fails; the subscriber is
    ///   not registered in that case.
    /// - [`EventError::InvalidConfiguration`] when the id allocator hands out an id that
    ///   is already registered.
    pub fn subscribe_with(
        &self,
        callback: Option<Callback>,
        companion: Option<Value>,
        context: ContextOverride,
    ) -> Result<Handle, EventError> {
        let Some(callback) = callback else {
            return Err(EventError::InvalidSubscriber {
                message: "a callback is required".into(),
                context: Some(format!("Subscribing to '{}'", self.event_type()).into()),
            });
        };

        if let Some(notifier) = &self.inner.subscribe_event {
            let notice = Args::from_values(vec![
                value(callback.clone()),
                value(companion.clone()),
                value(context.clone()),
            ]);
            notifier.fire(notice).context("Announcing new subscriber")?;
        }

        let ordinal = {
            let mut state = self.inner.state.lock();
            let ordinal = state.next_ordinal;
            state.next_ordinal += 1;
            ordinal
        };
        let subscription =
            Arc::new(Subscription::new(self.inner.ids.allocate(), ordinal, callback, companion, context));
        self.log(Level::DEBUG, || format!("{self}->Subscribe: {subscription}"));

        // `fired` is checked and the subscription registered under one guard: a first fire
        // still in progress replays it once its pass completes.
        let replay = {
            let mut state = self.inner.state.lock();
            match state.fired_with.clone() {
                Some(args) if self.inner.fire_once && state.fired => Some(args),
                _ => {
                    self.register(&mut state, &subscription)?;
                    None
                },
            }
        };
        if let Some(args) = replay {
            self.replay(&subscription, &args)?;
            self.register(&mut self.inner.state.lock(), &subscription)?;
        }

        Ok(Handle::new(Arc::downgrade(&self.inner), subscription))
    }

    fn register(&self, state: &mut EventState, subscription: &Arc<Subscription>) -> Result<(), EventError> {
        if state.subscribers.contains_key(&subscription.id()) {
            subscription.tombstone();
            return Err(EventError::InvalidConfiguration {
                message: format!("id allocator returned duplicate id {}", subscription.id()).into(),
                context: Some(format!("Subscribing to '{}'", self.event_type()).into()),
            });
        }
        state.subscribers.insert(subscription.id(), Arc::clone(subscription));
        Ok(())
    }

    /// Delivers the completed fire of a fire-once event to one subscriber. A failure
    /// tombstones the subscription, whatever the signature.
    fn replay(&self, subscription: &Subscription, args: &Args) -> Result<(), EventError> {
        self.log(Level::DEBUG, || format!("{self}: replaying completed fire to {subscription}"));
        let failure = match self.notify(subscription, args) {
            Ok(notified) => notified.error,
            Err(EventError::Subscriber { source, .. }) => Some(source),
            Err(other) => {
                subscription.tombstone();
                return Err(other);
            },
        };
        match failure {
            Some(source) => {
                subscription.tombstone();
                Err(EventError::Subscriber {
                    source,
                    context: Some(format!("Replaying '{}' to a late subscriber", self.event_type()).into()),
                })
            },
            None => Ok(()),
        }
    }

    /// Removes subscriptions.
    ///
    /// - [`Unsubscribe::Handle`] detaches exactly that subscription.
    /// - [`Unsubscribe::Callback`] removes every subscription whose effective or original
    ///   callback is `callback` and, if a companion is given, whose companion is that
    ///   same value.
    /// - [`Unsubscribe::All`] behaves like [`CustomEvent::unsubscribe_all`].
    ///
    /// Returns `true` if at least one subscription was removed.
    pub fn unsubscribe(&self, target: impl Into<Unsubscribe>) -> bool {
        match target.into() {
            Unsubscribe::All => self.unsubscribe_all() > 0,
            Unsubscribe::Handle(handle) => handle.detach(),
            Unsubscribe::Callback { callback, companion } => {
                let matching: Vec<Arc<Subscription>> = {
                    let state = self.inner.state.lock();
                    state
                        .subscribers
                        .values()
                        .filter(|s| s.matches(&callback, companion.as_ref()))
                        .cloned()
                        .collect()
                };
                matching.iter().fold(false, |removed, s| self.inner.delete(s) || removed)
            },
        }
    }

    /// Removes and tombstones every subscription. Returns how many were removed.
    pub fn unsubscribe_all(&self) -> usize {
        let drained: Vec<Arc<Subscription>> =
            self.inner.state.lock().subscribers.drain().map(|(_, s)| s).collect();
        for subscription in &drained {
            subscription.tombstone();
        }
        self.log(Level::DEBUG, || format!("{self}: removed {} subscriber(s)", drained.len()));
        drained.len()
    }

    /// Notifies a snapshot of the current subscribers, in subscribe order.
    ///
    /// Returns `Ok(false)` if a subscriber vetoed ([`Propagation::Stop`]), which ends
    /// the pass. A fire-once event that already fired returns `Ok(true)` without
    /// notifying anyone. On the first completed fire of a fire-once event, subscribers
    /// added during the pass are replayed its arguments before `fire` returns.
    ///
    /// # Errors
    /// - FLAT: the first failing subscriber's error, as [`EventError::Subscriber`]. The
    ///   rest of the pass is skipped and the event is not marked as fired. A failed
    ///   replay to a subscriber added during the pass is returned after every such
    ///   subscriber was replayed.
    /// - LIST: [`EventError::Chained`] carrying every failure in dispatch order, raised
    ///   after the pass even when a later subscriber vetoed. Failed replays are
    ///   appended.
    ///
    /// Subscribers whose replay fails are removed.
    pub fn fire(&self, args: Args) -> Result<bool, EventError> {
        let snapshot = {
            let state = self.inner.state.lock();
            if self.inner.fire_once && state.fired {
                drop(state);
                self.log(Level::DEBUG, || format!("{self} already fired; ignoring"));
                return Ok(true);
            }
            let mut snapshot: Vec<Arc<Subscription>> = state.subscribers.values().cloned().collect();
            drop(state);
            snapshot.sort_unstable_by_key(|s| s.ordinal());
            snapshot
        };

        self.log(Level::DEBUG, || {
            format!("Firing {self}, args: {}, subscribers: {}", args.len(), snapshot.len())
        });

        let mut errors = Vec::new();
        let mut result = true;
        for subscription in &snapshot {
            let notified = self.notify(subscription, &args)?;
            if let Some(error) = notified.error {
                errors.push(error);
            }
            if notified.propagation == Propagation::Stop {
                self.log(Level::DEBUG, || format!("{self}: propagation stopped by {subscription}"));
                result = false;
                break;
            }
        }

        let mut late: Vec<Arc<Subscription>> = {
            let mut state = self.inner.state.lock();
            let first = !state.fired;
            state.fired = true;
            if self.inner.fire_once && first {
                state.fired_with = Some(args.clone());
                let dispatched: FxHashSet<SubscriptionId> = snapshot.iter().map(|s| s.id()).collect();
                state.subscribers.values().filter(|s| !dispatched.contains(&s.id())).cloned().collect()
            } else {
                Vec::new()
            }
        };

        // Subscribed during the pass: they missed it and saw `fired == false`.
        late.sort_unstable_by_key(|s| s.ordinal());
        let mut replay_failure = None;
        for subscription in &late {
            if let Err(err) = self.replay(subscription, &args) {
                self.inner.delete(subscription);
                match err {
                    EventError::Subscriber { source, .. } if self.inner.signature.isolates_errors() => {
                        errors.push(source);
                    },
                    other => {
                        replay_failure.get_or_insert(other);
                    },
                }
            }
        }
        if let Some(err) = replay_failure {
            return Err(err);
        }

        if errors.is_empty() {
            Ok(result)
        } else {
            Err(ChainedError::from_fire(self.event_type(), errors).into())
        }
    }

    fn notify(&self, subscription: &Subscription, args: &Args) -> Result<Notified, EventError> {
        *self.inner.last_error.lock() = None;

        let Some((callback, companion)) = subscription.target() else {
            return Ok(Notified::SKIPPED);
        };
        let context = subscription.resolve_context(&self.inner.context);
        self.log(Level::TRACE, || format!("{self}->Notifying: {subscription}"));

        let isolated = self.inner.signature.isolates_errors();
        let payload = if isolated {
            Payload::List { event_type: self.event_type(), args, companion: companion.as_ref() }
        } else {
            Payload::Flat(args)
        };

        match callback.call(&Invocation { context: &context, payload }) {
            Ok(propagation) => Ok(Notified { propagation, error: None }),
            Err(error) if isolated => {
                let error: SharedError = Arc::from(error);
                self.log(Level::ERROR, || format!("{self}: {subscription} failed: {error}"));
                *self.inner.last_error.lock() = Some(Arc::clone(&error));
                Ok(Notified { propagation: Propagation::Continue, error: Some(error) })
            },
            Err(error) => Err(EventError::Subscriber {
                source: Arc::from(error),
                context: Some(format!("Firing '{}'", self.event_type()).into()),
            }),
        }
    }

    fn log(&self, level: Level, message: impl FnOnce() -> String) {
        if !self.inner.silent {
            self.inner.sink.log(&message(), level);
        }
    }
}

impl Display for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomEvent: '{}'", self.inner.event_type)
    }
}
