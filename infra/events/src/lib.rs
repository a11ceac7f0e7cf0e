//! # Custom Events
//!
//! A synchronous, single-owner event primitive: components create a named
//! [`CustomEvent`], other components subscribe callbacks to it, and the owner fires it
//! to notify every current subscriber on the caller's stack.
//!
//! ## Features
//!
//! * **Identity-based unsubscribe**: by [`Handle`], or by [`Callback`] identity optionally
//!   narrowed to a companion value ([`Unsubscribe`]).
//! * **Two signatures**: [`Signature::Flat`] passes the raw arguments and lets the first
//!   failure abort the pass; [`Signature::List`] passes `(type, args, companion)` and
//!   aggregates failures into a [`ChainedError`].
//! * **Veto**: a subscriber returning `false` ([`Propagation::Stop`]) ends the pass.
//! * **Snapshot dispatch**: subscribers added during a fire are not called by that fire.
//! * **Fire-once**: late subscribers are replayed the completed fire immediately.
//! * **Subscribe notifications**: every event owns a child event fired before each new
//!   subscription is registered.
//!
//! Nothing here is asynchronous. A slow subscriber blocks the caller of `fire` and
//! every subscriber after it.
//!
//! # Example
//!
//! ```rust
//! use herald_event::{Callback, CustomEvent, EventError, args};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! # fn main() -> Result<(), EventError> {
//! let ready = CustomEvent::builder().event_type("ready").fire_once(true).build()?;
//! let calls = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&calls);
//! ready.subscribe(Callback::new(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }))?;
//! ready.fire(args!["booted"])?;
//!
//! // A late subscriber is replayed the completed fire before `subscribe` returns.
//! let counter = Arc::clone(&calls);
//! ready.subscribe(Callback::new(move |inv| {
//!     assert_eq!(inv.args().get::<&str>(0), Some(&"booted"));
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }))?;
//!
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # Ok(())
//! # }
//! ```

mod args;
mod builder;
mod callback;
mod chained;
mod error;
mod event;
mod handle;
mod log;
mod subscription;

pub use args::{Args, GlobalContext, Value, default_context, same_value, value};
pub use builder::{EventBuilder, NoType, SubscribeBuilder, WithType};
pub use callback::{Callback, IntoOutcome, Invocation, Outcome, Payload, Propagation, SubscriberError};
pub use chained::ChainedError;
pub use error::{EventError, EventErrorExt, SharedError};
pub use event::{CustomEvent, EventRef, SUBSCRIBE_EVENT_TYPE, Signature};
pub use handle::{Handle, Unsubscribe};
pub use log::{LOG_EVENT_TYPE, LogSink, TracingSink};
pub use subscription::{
    ContextOverride, IdAllocator, SequentialIds, Subscription, SubscriptionId, shared_ids,
};
