//! # Listeners
//!
//! A listener is a callback registered on an [`EventDispatcher`] for one
//! event type. Message listeners receive a [`QueueMessage`]; error listeners
//! receive a [`ConsumerError`].
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Listener`] uses native `async fn` for implementors. Dispatchers store
//! listeners as [`ListenerRef`], a shared handle over the object-safe
//! [`DynListener`]. The handle is also the listener's identity: two handles
//! are equal when they point at the same registration.
//!
//! [`EventDispatcher`]: crate::EventDispatcher
//! [`QueueMessage`]: crate::QueueMessage
//! [`ConsumerError`]: crate::ConsumerError

use crate::error::{BoxError, CaughtPanic};
use futures::{FutureExt, future::BoxFuture};
use std::{fmt, future::Future, panic::AssertUnwindSafe, sync::Arc};

/// A callback invoked for every event dispatched to it.
///
/// Returning `Err` marks this invocation as failed. It never prevents the
/// remaining listeners of the same dispatch from running.
///
/// Synchronous closures of the form `Fn(&E) -> Result<(), BoxError>` are
/// listeners out of the box. Implement the trait on a struct when the
/// listener needs to await (e.g. to acknowledge the message).
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Listener` for `{E}`",
    label = "missing `Listener` implementation",
    note = "Closures must have the signature `Fn(&{E}) -> Result<(), BoxError>`."
)]
pub trait Listener<E>: Send + Sync + 'static {
    /// Called once per dispatched event.
    fn on_event(&self, event: &E) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<E, F> Listener<E> for F
where
    E: Sync,
    F: Fn(&E) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &E) -> impl Future<Output = Result<(), BoxError>> + Send {
        futures::future::lazy(move |_| (self)(event))
    }
}

/// Dynamic object-safe version of [`Listener`].
pub trait DynListener<E>: Send + Sync {
    /// Called once per dispatched event (dynamic dispatch version).
    fn on_event_dyn<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>>;
}

impl<E, L> DynListener<E> for L
where
    E: Sync,
    L: Listener<E>,
{
    fn on_event_dyn<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.on_event(event))
    }
}

/// A shared handle to a registered listener.
///
/// Cloning is O(1). Equality is identity: a handle equals its clones and
/// nothing else, which is what [`EventDispatcher::has`] and
/// [`EventDispatcher::remove`] compare.
///
/// [`EventDispatcher::has`]: crate::EventDispatcher::has
/// [`EventDispatcher::remove`]: crate::EventDispatcher::remove
pub struct ListenerRef<E>(Arc<dyn DynListener<E>>);

impl<E: Sync + 'static> ListenerRef<E> {
    /// Wrap a listener into a new handle.
    pub fn new<L: Listener<E>>(listener: L) -> Self {
        Self(Arc::new(listener))
    }
}

impl<E> ListenerRef<E> {
    /// Invoke the listener, converting a panic into a [`CaughtPanic`] error.
    ///
    /// Covers panics raised while the listener builds its future as well as
    /// while it is polled.
    pub async fn call(&self, event: &E) -> Result<(), BoxError> {
        let invocation = async { self.0.on_event_dyn(event).await };
        match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(Box::new(CaughtPanic::from_payload(payload))),
        }
    }
}

impl<E> Clone for ListenerRef<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E> PartialEq for ListenerRef<E> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl<E> Eq for ListenerRef<E> {}

impl<E> fmt::Debug for ListenerRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerRef")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}
