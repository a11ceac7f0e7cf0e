//! Subscriber callbacks and the shapes they are invoked with.

use crate::args::{Args, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The error type a subscriber may fail with.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a single subscriber invocation.
pub type Outcome = Result<Propagation, SubscriberError>;

/// Whether the current fire pass continues after a subscriber returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Propagation {
    #[default]
    Continue,
    /// Veto: no further subscriber is notified in this pass and `fire` returns `false`.
    Stop,
}

/// Conversion from a subscriber's return value into an [`Outcome`].
///
/// `false` maps to [`Propagation::Stop`]; unit and `true` continue.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Ok(Propagation::Continue)
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> Outcome {
        Ok(if self { Propagation::Continue } else { Propagation::Stop })
    }
}

impl IntoOutcome for Propagation {
    fn into_outcome(self) -> Outcome {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<SubscriberError>,
{
    fn into_outcome(self) -> Outcome {
        self.map_err(Into::into).and_then(IntoOutcome::into_outcome)
    }
}

/// Argument shape delivered to a subscriber, selected by the event's
/// [`Signature`](crate::Signature).
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// The raw fire arguments. A companion bound at subscribe time is appended as the last value.
    Flat(&'a Args),
    /// Exactly three positional values: event type, raw fire arguments and companion.
    List { event_type: &'a str, args: &'a Args, companion: Option<&'a Value> },
}

/// Everything a subscriber sees when it is notified.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub context: &'a Value,
    pub payload: Payload<'a>,
}

impl<'a> Invocation<'a> {
    /// The fire arguments, regardless of the signature.
    #[must_use]
    pub const fn args(&self) -> &'a Args {
        match self.payload {
            Payload::Flat(args) | Payload::List { args, .. } => args,
        }
    }

    /// The companion value; only LIST invocations carry it separately.
    #[must_use]
    pub const fn companion(&self) -> Option<&'a Value> {
        match self.payload {
            Payload::Flat(_) => None,
            Payload::List { companion, .. } => companion,
        }
    }

    /// The event type; only LIST invocations carry it.
    #[must_use]
    pub const fn event_type(&self) -> Option<&'a str> {
        match self.payload {
            Payload::Flat(_) => None,
            Payload::List { event_type, .. } => Some(event_type),
        }
    }

    /// Downcasts the resolved execution context.
    #[must_use]
    pub fn context_as<T: Any>(&self) -> Option<&'a T> {
        self.context.downcast_ref::<T>()
    }
}

type CallbackFn = dyn Fn(&Invocation<'_>) -> Outcome + Send + Sync;

/// A shareable subscriber callback.
///
/// Two `Callback`s are equal only when they are clones of the same allocation, which is
/// what identity-based unsubscribe relies on. Keep a clone around to unsubscribe later.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    /// Wraps a closure. The closure may return `()`, `bool`, [`Propagation`] or a
    /// `Result` of any of those.
    ///
    /// ```rust
    /// use herald_event::{Callback, Propagation};
    ///
    /// let quiet = Callback::new(|_| ());
    /// let veto = Callback::new(|_| false);
    /// let fallible = Callback::new(|inv| {
    ///     inv.args().get::<u32>(0).ok_or("missing count")?;
    ///     Ok::<_, &str>(Propagation::Continue)
    /// });
    /// # let _ = (quiet, veto, fallible);
    /// ```
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        Self(Arc::new(move |inv: &Invocation<'_>| f(inv).into_outcome()))
    }

    pub fn call(&self, invocation: &Invocation<'_>) -> Outcome {
        (self.0)(invocation)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Pre-binds `companion`: FLAT invocations get it appended to their arguments,
    /// LIST invocations already carry it and pass through untouched.
    pub(crate) fn bind_companion(&self, companion: Value) -> Self {
        let inner = self.clone();
        Self::new(move |inv: &Invocation<'_>| match inv.payload {
            Payload::Flat(args) => {
                let extended = args.appended(Arc::clone(&companion));
                inner.call(&Invocation { context: inv.context, payload: Payload::Flat(&extended) })
            },
            Payload::List { .. } => inner.call(inv),
        })
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&Arc::as_ptr(&self.0).cast::<()>()).finish()
    }
}
