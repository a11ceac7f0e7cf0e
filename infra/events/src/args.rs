//! Dynamic values carried by events: contexts, companions and fire arguments.

use std::any::Any;
use std::sync::{Arc, LazyLock};

/// An opaque, shareable value.
///
/// Identity comparisons (companions, contexts) use pointer identity, never deep equality.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Marker type of the process-wide default context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalContext;

static DEFAULT_CONTEXT: LazyLock<Value> = LazyLock::new(|| Arc::new(GlobalContext));

/// Returns the context used by events that were not given one.
#[must_use]
pub fn default_context() -> Value {
    Arc::clone(&DEFAULT_CONTEXT)
}

/// Wraps any value into a [`Value`].
///
/// Passing something that is already a [`Value`] wraps it a second time; clone the
/// [`Value`] instead when identity must be preserved.
#[must_use]
pub fn value<T: Any + Send + Sync>(inner: T) -> Value {
    Arc::new(inner)
}

/// Returns `true` when both values are the same allocation.
#[must_use]
pub fn same_value(a: &Value, b: &Value) -> bool {
    Arc::ptr_eq(a, b)
}

/// Ordered argument list delivered to subscribers.
///
/// Cloning is cheap: only the `Arc`s are cloned.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    #[must_use]
    pub const fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Returns a copy of these arguments with `value` appended.
    #[must_use]
    pub fn appended(&self, value: Value) -> Self {
        let mut values = Vec::with_capacity(self.values.len() + 1);
        values.extend(self.values.iter().cloned());
        values.push(value);
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value at `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value at `index` if it holds a `T`.
    #[must_use]
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Builds an [`Args`] list, wrapping every expression with [`value`](crate::value).
///
/// ```rust
/// let args = herald_event::args![1_u32, "two", String::from("three")];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args.get::<u32>(0), Some(&1));
/// assert_eq!(args.get::<&str>(1), Some(&"two"));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::from_values(vec![$($crate::value($arg)),+])
    };
}
