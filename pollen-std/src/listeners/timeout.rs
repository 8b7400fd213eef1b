//! Timeout listener for time-limited execution.

use pollen_core::{BoxError, Listener};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Error returned when a listener runs past its deadline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listener timed out after {0:?}")]
pub struct ListenerTimeout(pub Duration);

/// A listener that wraps another listener with a timeout.
///
/// The consumer engine awaits message listeners one at a time, so a stuck
/// listener delays every listener after it. Wrapping it bounds that delay;
/// an elapsed listener fails with [`ListenerTimeout`].
pub struct TimeoutListener<L> {
    inner: L,
    duration: Duration,
}

impl<L> TimeoutListener<L> {
    /// Create a new timeout listener.
    pub fn new(inner: L, duration: Duration) -> Self {
        Self { inner, duration }
    }
}

impl<E: Sync, L: Listener<E>> Listener<E> for TimeoutListener<L> {
    async fn on_event(&self, event: &E) -> Result<(), BoxError> {
        match timeout(self.duration, self.inner.on_event(event)).await {
            Ok(result) => result,
            Err(_) => Err(Box::new(ListenerTimeout(self.duration))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowListener(Duration);

    impl Listener<u8> for SlowListener {
        async fn on_event(&self, _event: &u8) -> Result<(), BoxError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_listener_fails() {
        let listener =
            TimeoutListener::new(SlowListener(Duration::from_secs(5)), Duration::from_secs(1));
        let err = listener.on_event(&0).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ListenerTimeout>(),
            Some(&ListenerTimeout(Duration::from_secs(1)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_listener_passes_through() {
        let listener = TimeoutListener::new(
            SlowListener(Duration::from_millis(10)),
            Duration::from_secs(1),
        );
        assert!(listener.on_event(&0).await.is_ok());
    }
}
