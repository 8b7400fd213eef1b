//! Testing utilities for Pollen.
//!
//! This module provides listeners that make asserting on dispatches easier.
//!
//! # Features
//!
//! - [`RecordingListener`]: A listener that records all events it receives
//! - [`CountingListener`]: A listener that counts invocations
//! - [`FailingListener`]: A listener that always fails and counts invocations

use pollen_core::{BoxError, Listener};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Recording Listener
// ============================================================================

/// A listener that records a projection of every event it receives.
///
/// Events themselves are often not `Clone` (a message handle owns its raw
/// provider message), so the recorder stores whatever `project` returns.
///
/// # Example
///
/// ```rust,ignore
/// let bodies = RecordingListener::new(|m: &QueueMessage<InMemoryQueue, String>| m.body().clone());
/// consumer.on_message().listen(bodies.clone());
///
/// consumer.run_once().await;
/// assert_eq!(bodies.events(), vec!["a", "b"]);
/// ```
pub struct RecordingListener<E, R> {
    events: Arc<Mutex<Vec<R>>>,
    project: Arc<dyn Fn(&E) -> R + Send + Sync>,
}

impl<E, R> RecordingListener<E, R> {
    /// Create a recorder storing `project(event)` for each event.
    pub fn new(project: impl Fn(&E) -> R + Send + Sync + 'static) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            project: Arc::new(project),
        }
    }

    /// Get a clone of the recorded values.
    pub fn events(&self) -> Vec<R>
    where
        R: Clone,
    {
        self.lock().clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<R>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> RecordingListener<E, E>
where
    E: Clone + 'static,
{
    /// Create a recorder storing a clone of each event.
    pub fn cloning() -> Self {
        Self::new(E::clone)
    }
}

impl<E, R> Clone for RecordingListener<E, R> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            project: self.project.clone(),
        }
    }
}

impl<E, R> Listener<E> for RecordingListener<E, R>
where
    E: Sync + 'static,
    R: Send + 'static,
{
    async fn on_event(&self, event: &E) -> Result<(), BoxError> {
        let value = (self.project)(event);
        self.lock().push(value);
        Ok(())
    }
}

// ============================================================================
// Counting Listener
// ============================================================================

/// A listener that counts invocations.
#[derive(Clone, Default)]
pub struct CountingListener {
    count: Arc<AtomicUsize>,
}

impl CountingListener {
    /// Create a new counting listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<E: Sync> Listener<E> for CountingListener {
    async fn on_event(&self, _event: &E) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Failing Listener
// ============================================================================

/// A listener that fails every invocation with a fixed message.
#[derive(Clone)]
pub struct FailingListener {
    message: Arc<str>,
    count: Arc<AtomicUsize>,
}

impl FailingListener {
    /// Create a listener failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of invocations so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<E: Sync> Listener<E> for FailingListener {
    async fn on_event(&self, _event: &E) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Err(self.message.to_string().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollen_core::EventDispatcher;

    #[tokio::test]
    async fn test_recording_listener_projects_events() {
        let recorder = RecordingListener::new(|s: &String| s.len());
        let dispatcher = EventDispatcher::new();
        dispatcher.listen(recorder.clone());

        dispatcher.dispatch(&"abc".to_string()).await;
        dispatcher.dispatch(&"de".to_string()).await;

        assert_eq!(recorder.events(), vec![3, 2]);
        recorder.clear();
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_counting_and_failing_listeners() {
        let counter = CountingListener::new();
        let failing = FailingListener::new("nope");
        let dispatcher = EventDispatcher::<u8>::new();
        dispatcher.listen(failing.clone());
        dispatcher.listen(counter.clone());

        let failures = dispatcher.dispatch(&1).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].to_string(), "nope");
        assert_eq!(failing.count(), 1);
        assert_eq!(counter.count(), 1);

        counter.reset();
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test]
    async fn test_cloning_recorder() {
        let recorder = RecordingListener::<u8, u8>::cloning();
        recorder.on_event(&4).await.unwrap();
        assert_eq!(recorder.events(), vec![4]);
    }
}
