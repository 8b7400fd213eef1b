//! Logging listener for event observation.

use pollen_core::{BoxError, Listener};
use std::fmt::Debug;

/// A listener that logs every event it receives.
///
/// Logs through `tracing` at `LoggingListener::LEVEL` when the `tracing`
/// feature is enabled. The consumer already logs every failure at `warn`,
/// so on an error dispatcher this listener adds the full event at `debug`
/// instead of repeating the warning.
///
/// # Example
///
/// ```rust,ignore
/// use pollen_std::listeners::LoggingListener;
///
/// consumer.on_error().listen(LoggingListener::named("orders"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoggingListener {
    name: &'static str,
}

impl LoggingListener {
    /// Level of the records this listener emits.
    #[cfg(feature = "tracing")]
    pub const LEVEL: tracing::Level = tracing::Level::DEBUG;

    /// Create a new `LoggingListener` with a default name.
    pub fn new() -> Self {
        Self { name: "consumer" }
    }

    /// Create a new `LoggingListener` with a custom name.
    ///
    /// The name is used in log records to identify the consumer.
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }

    /// The name attached to log records.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Debug + Sync> Listener<E> for LoggingListener {
    async fn on_event(&self, event: &E) -> Result<(), BoxError> {
        #[cfg(feature = "tracing")]
        {
            tracing::event!(LoggingListener::LEVEL, name = %self.name, event = ?event, "consumer event");
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = event;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestEvent {
        #[allow(dead_code)]
        data: String,
    }

    #[tokio::test]
    async fn test_logging_listener_never_fails() {
        let listener = LoggingListener::new();
        let event = TestEvent {
            data: "test".into(),
        };

        assert!(listener.on_event(&event).await.is_ok());
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_logs_below_consumer_warnings() {
        assert!(LoggingListener::LEVEL > tracing::Level::WARN);
    }

    #[test]
    fn test_logging_listener_named() {
        assert_eq!(LoggingListener::named("orders").name(), "orders");
        assert_eq!(LoggingListener::default().name(), "consumer");
    }
}
