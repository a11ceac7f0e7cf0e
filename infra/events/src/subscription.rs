use crate::args::{Value, same_value};
use crate::callback::Callback;
use parking_lot::Mutex;
use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Key of a [`Subscription`] inside its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Source of subscription ids. Ids must be unique within every event that uses the
/// allocator.
pub trait IdAllocator: Debug + Send + Sync {
    fn allocate(&self) -> SubscriptionId;
}

/// Monotonic counter starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIds {
    fn allocate(&self) -> SubscriptionId {
        SubscriptionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

static SHARED_IDS: LazyLock<Arc<SequentialIds>> = LazyLock::new(|| Arc::new(SequentialIds::new()));

/// The allocator events use unless one is injected through the builder.
#[must_use]
pub fn shared_ids() -> Arc<dyn IdAllocator> {
    SHARED_IDS.clone()
}

/// Which execution context a subscriber is invoked with.
#[derive(Debug, Clone, Default)]
pub enum ContextOverride {
    /// Use the event's context.
    #[default]
    None,
    /// Use the subscription's companion; falls back to the event context when there is none.
    Companion,
    /// Use this value.
    Explicit(Value),
}

struct Bound {
    callback: Callback,
    original: Callback,
    companion: Option<Value>,
}

/// A registered subscriber.
///
/// The callback, the original callback and the companion are cleared together, once,
/// when the subscription is deleted from its event.
pub struct Subscription {
    id: SubscriptionId,
    ordinal: u64,
    context: ContextOverride,
    bound: Mutex<Option<Bound>>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        ordinal: u64,
        callback: Callback,
        companion: Option<Value>,
        context: ContextOverride,
    ) -> Self {
        let effective = companion.as_ref().map_or_else(
            || callback.clone(),
            |companion| callback.bind_companion(Arc::clone(companion)),
        );
        Self {
            id,
            ordinal,
            context,
            bound: Mutex::new(Some(Bound { callback: effective, original: callback, companion })),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) const fn ordinal(&self) -> u64 {
        self.ordinal
    }

    #[must_use]
    pub const fn context_override(&self) -> &ContextOverride {
        &self.context
    }

    /// The callback that is actually invoked. `None` once deleted.
    #[must_use]
    pub fn callback(&self) -> Option<Callback> {
        self.bound.lock().as_ref().map(|b| b.callback.clone())
    }

    /// The callback as it was handed to `subscribe`. `None` once deleted.
    #[must_use]
    pub fn original_callback(&self) -> Option<Callback> {
        self.bound.lock().as_ref().map(|b| b.original.clone())
    }

    #[must_use]
    pub fn companion(&self) -> Option<Value> {
        self.bound.lock().as_ref().and_then(|b| b.companion.clone())
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.bound.lock().is_none()
    }

    /// Identity match used by unsubscribe: the callback must be either the effective or
    /// the original callback, and when `companion` is given it must be the same value.
    #[must_use]
    pub fn matches(&self, callback: &Callback, companion: Option<&Value>) -> bool {
        let guard = self.bound.lock();
        let Some(bound) = guard.as_ref() else {
            return false;
        };
        let same_fn = bound.callback.ptr_eq(callback) || bound.original.ptr_eq(callback);
        let same_companion = match (companion, bound.companion.as_ref()) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => same_value(wanted, actual),
            (Some(_), None) => false,
        };
        same_fn && same_companion
    }

    /// Resolves the execution context for a notification.
    #[must_use]
    pub fn resolve_context(&self, default: &Value) -> Value {
        match &self.context {
            ContextOverride::Explicit(context) => Arc::clone(context),
            ContextOverride::Companion => self.companion().unwrap_or_else(|| Arc::clone(default)),
            ContextOverride::None => Arc::clone(default),
        }
    }

    /// Returns the invocable callback and companion, or `None` once deleted.
    pub(crate) fn target(&self) -> Option<(Callback, Option<Value>)> {
        self.bound.lock().as_ref().map(|b| (b.callback.clone(), b.companion.clone()))
    }

    /// Clears callback, original callback and companion. Returns `false` when the
    /// subscription was already deleted.
    pub(crate) fn tombstone(&self) -> bool {
        self.bound.lock().take().is_some()
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.bound.lock();
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("companion", &guard.as_ref().and_then(|b| b.companion.as_ref()))
            .field("deleted", &guard.is_none())
            .finish_non_exhaustive()
    }
}

impl Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_companion = self.bound.lock().as_ref().is_some_and(|b| b.companion.is_some());
        let context = match self.context {
            ContextOverride::None => "event",
            ContextOverride::Companion => "companion",
            ContextOverride::Explicit(_) => "explicit",
        };
        write!(f, "Subscription {} (companion: {has_companion}, context: {context})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{default_context, value};

    fn subscription(callback: &Callback, companion: Option<Value>, context: ContextOverride) -> Subscription {
        Subscription::new(SubscriptionId::new(1), 0, callback.clone(), companion, context)
    }

    #[test]
    fn matches_effective_and_original_callback() {
        let cb = Callback::new(|_| ());
        let companion = value(3_u8);
        let sub = subscription(&cb, Some(Arc::clone(&companion)), ContextOverride::None);

        let effective = sub.callback().expect("live subscription has a callback");
        assert_ne!(effective, cb, "a companion wraps the callback");
        assert!(sub.matches(&cb, None));
        assert!(sub.matches(&effective, None));
        assert!(sub.matches(&cb, Some(&companion)));
        assert!(!sub.matches(&cb, Some(&value(3_u8))), "companions compare by identity");
        assert!(!sub.matches(&Callback::new(|_| ()), None));
    }

    #[test]
    fn companion_filter_requires_a_companion() {
        let cb = Callback::new(|_| ());
        let sub = subscription(&cb, None, ContextOverride::None);
        assert!(!sub.matches(&cb, Some(&value(1_u8))));
    }

    #[test]
    fn tombstone_happens_once() {
        let cb = Callback::new(|_| ());
        let sub = subscription(&cb, Some(value(1_u8)), ContextOverride::None);
        assert!(sub.tombstone());
        assert!(!sub.tombstone());
        assert!(sub.is_deleted());
        assert!(sub.callback().is_none());
        assert!(sub.original_callback().is_none());
        assert!(sub.companion().is_none());
        assert!(!sub.matches(&cb, None));
    }

    #[test]
    fn context_resolution() {
        let cb = Callback::new(|_| ());
        let default = default_context();
        let companion = value("companion");
        let explicit = value("explicit");

        let sub = subscription(&cb, Some(Arc::clone(&companion)), ContextOverride::None);
        assert!(same_value(&sub.resolve_context(&default), &default));

        let sub = subscription(&cb, Some(Arc::clone(&companion)), ContextOverride::Companion);
        assert!(same_value(&sub.resolve_context(&default), &companion));

        let sub = subscription(&cb, None, ContextOverride::Companion);
        assert!(same_value(&sub.resolve_context(&default), &default));

        let sub = subscription(&cb, Some(companion), ContextOverride::Explicit(Arc::clone(&explicit)));
        assert!(same_value(&sub.resolve_context(&default), &explicit));
    }

    #[test]
    fn sequential_ids_are_unique() {
        let ids = SequentialIds::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(a.to_string(), "sub-1");
    }
}
