use crate::args::Value;
use crate::callback::Callback;
use crate::event::EventInner;
use crate::subscription::{Subscription, SubscriptionId};
use std::fmt;
use std::sync::{Arc, Weak};

/// Detaches one subscription without needing the event it belongs to.
///
/// Holds only a weak reference to the event, so outstanding handles never keep an event
/// alive.
#[derive(Clone)]
pub struct Handle {
    event: Weak<EventInner>,
    subscription: Arc<Subscription>,
}

impl Handle {
    pub(crate) const fn new(event: Weak<EventInner>, subscription: Arc<Subscription>) -> Self {
        Self { event, subscription }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// `true` while the subscription is still registered.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.subscription.is_deleted()
    }

    /// Removes the subscription from its event. Returns `false` if it was already gone
    /// or the event no longer exists.
    pub fn detach(&self) -> bool {
        self.event.upgrade().is_some_and(|event| event.delete(&self.subscription))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("subscription", &self.subscription.id())
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

/// Which subscriptions [`CustomEvent::unsubscribe`](crate::CustomEvent::unsubscribe) removes.
#[derive(Debug, Clone)]
pub enum Unsubscribe {
    /// Every subscription.
    All,
    /// Exactly the subscription behind this handle.
    Handle(Handle),
    /// Subscriptions of this callback, optionally narrowed to one companion.
    Callback { callback: Callback, companion: Option<Value> },
}

impl From<Handle> for Unsubscribe {
    fn from(handle: Handle) -> Self {
        Self::Handle(handle)
    }
}

impl From<&Handle> for Unsubscribe {
    fn from(handle: &Handle) -> Self {
        Self::Handle(handle.clone())
    }
}

impl From<Callback> for Unsubscribe {
    fn from(callback: Callback) -> Self {
        Self::Callback { callback, companion: None }
    }
}

impl From<&Callback> for Unsubscribe {
    fn from(callback: &Callback) -> Self {
        Self::Callback { callback: callback.clone(), companion: None }
    }
}

impl From<(Callback, Value)> for Unsubscribe {
    fn from((callback, companion): (Callback, Value)) -> Self {
        Self::Callback { callback, companion: Some(companion) }
    }
}

impl From<(&Callback, &Value)> for Unsubscribe {
    fn from((callback, companion): (&Callback, &Value)) -> Self {
        Self::Callback { callback: callback.clone(), companion: Some(Arc::clone(companion)) }
    }
}
