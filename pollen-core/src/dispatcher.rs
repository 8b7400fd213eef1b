//! Ordered fan-out of one event type to its listeners.

use crate::{
    error::BoxError,
    listener::{Listener, ListenerRef},
};
use std::sync::{PoisonError, RwLock};

/// A typed, ordered collection of listeners for one event type.
///
/// Insertion order is dispatch order. Adding the same [`ListenerRef`] twice
/// registers it twice, and it is then invoked twice per dispatch.
///
/// # Example
///
/// ```rust
/// use pollen_core::{BoxError, EventDispatcher, ListenerRef};
///
/// let dispatcher = EventDispatcher::<String>::new();
/// let listener = ListenerRef::new(|s: &String| -> Result<(), BoxError> {
///     println!("{s}");
///     Ok(())
/// });
///
/// dispatcher.add(listener.clone());
/// assert!(dispatcher.has(&listener));
///
/// dispatcher.remove(&listener);
/// assert!(!dispatcher.has(&listener));
/// ```
pub struct EventDispatcher<E> {
    listeners: RwLock<Vec<ListenerRef<E>>>,
}

impl<E> EventDispatcher<E> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Append a listener. Returns the dispatcher for chaining.
    pub fn add(&self, listener: ListenerRef<E>) -> &Self {
        self.write().push(listener);
        self
    }

    /// Wrap `listener`, append it, and return its handle for later removal.
    pub fn listen<L>(&self, listener: L) -> ListenerRef<E>
    where
        E: Sync + 'static,
        L: Listener<E>,
    {
        let handle = ListenerRef::new(listener);
        self.add(handle.clone());
        handle
    }

    /// Whether `listener` is currently registered.
    pub fn has(&self, listener: &ListenerRef<E>) -> bool {
        self.read().iter().any(|l| l == listener)
    }

    /// Remove every registration of `listener`. Absent listeners are ignored.
    pub fn remove(&self, listener: &ListenerRef<E>) {
        self.write().retain(|l| l != listener);
    }

    /// Remove all listeners.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// A copy of the current listener sequence, in dispatch order.
    ///
    /// Later additions or removals do not affect the returned vector.
    pub fn snapshot(&self) -> Vec<ListenerRef<E>> {
        self.read().clone()
    }

    /// Invoke every listener with `event`, in insertion order, one at a time.
    ///
    /// The listener sequence is snapshotted first, so listeners that add or
    /// remove registrations only affect later dispatches. Every listener runs
    /// even if an earlier one failed; the failures are returned as they were
    /// raised, in invocation order. Deciding what to do with them is up to
    /// the caller.
    pub async fn dispatch(&self, event: &E) -> Vec<BoxError> {
        let mut failures = Vec::new();
        for listener in self.snapshot() {
            if let Err(e) = listener.call(event).await {
                failures.push(e);
            }
        }
        failures
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ListenerRef<E>>> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ListenerRef<E>>> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(id: usize, order: &Arc<Mutex<Vec<(usize, String)>>>) -> ListenerRef<String> {
        let order = order.clone();
        ListenerRef::new(move |event: &String| -> Result<(), BoxError> {
            order.lock().unwrap().push((id, event.clone()));
            Ok(())
        })
    }

    #[test]
    fn test_add_and_remove() {
        let dispatcher = EventDispatcher::<String>::new();
        let listener = ListenerRef::new(|_: &String| -> Result<(), BoxError> { Ok(()) });

        assert!(!dispatcher.has(&listener));
        dispatcher.add(listener.clone());
        assert!(dispatcher.has(&listener));

        dispatcher.remove(&listener);
        assert!(!dispatcher.has(&listener));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dispatcher = EventDispatcher::<String>::new();
        let kept = dispatcher.listen(|_: &String| -> Result<(), BoxError> { Ok(()) });
        let other = ListenerRef::new(|_: &String| -> Result<(), BoxError> { Ok(()) });

        dispatcher.remove(&other);
        assert_eq!(dispatcher.len(), 1);
        assert!(dispatcher.has(&kept));
    }

    #[test]
    fn test_remove_drops_every_duplicate() {
        let dispatcher = EventDispatcher::<String>::new();
        let listener = ListenerRef::new(|_: &String| -> Result<(), BoxError> { Ok(()) });

        dispatcher.add(listener.clone()).add(listener.clone());
        assert_eq!(dispatcher.len(), 2);

        dispatcher.remove(&listener);
        assert!(!dispatcher.has(&listener));
        assert_eq!(dispatcher.len(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_in_insertion_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = EventDispatcher::new();
        dispatcher
            .add(recorder(1, &order))
            .add(recorder(2, &order))
            .add(recorder(3, &order));

        let failures = dispatcher.dispatch(&"message".to_string()).await;

        assert!(failures.is_empty());
        let ids: Vec<usize> = order.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(order.lock().unwrap().iter().all(|(_, e)| e == "message"));
    }

    #[tokio::test]
    async fn test_duplicate_invoked_per_registration() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(7, &order);
        let dispatcher = EventDispatcher::new();
        dispatcher.add(listener.clone()).add(listener);

        dispatcher.dispatch(&"x".to_string()).await;

        assert_eq!(order.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_listeners() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = EventDispatcher::new();
        dispatcher.listen(|_: &String| -> Result<(), BoxError> { Err("first".into()) });
        dispatcher.add(recorder(2, &order));

        let failures = dispatcher.dispatch(&"x".to_string()).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].to_string(), "first");
        assert_eq!(order.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_uses_snapshot() {
        let dispatcher = Arc::new(EventDispatcher::<String>::new());
        let late_calls = Arc::new(Mutex::new(0));

        let d = dispatcher.clone();
        let calls = late_calls.clone();
        dispatcher.listen(move |_: &String| -> Result<(), BoxError> {
            let calls = calls.clone();
            d.listen(move |_: &String| -> Result<(), BoxError> {
                *calls.lock().unwrap() += 1;
                Ok(())
            });
            Ok(())
        });

        dispatcher.dispatch(&"first".to_string()).await;
        assert_eq!(*late_calls.lock().unwrap(), 0);
        assert_eq!(dispatcher.len(), 2);

        dispatcher.dispatch(&"second".to_string()).await;
        assert_eq!(*late_calls.lock().unwrap(), 1);
    }
}
