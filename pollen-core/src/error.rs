//! Error types for Pollen.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`ConsumerError`] - The failure taxonomy routed to a consumer's error dispatcher
//! - [`ConfigError`] - Startup errors surfaced synchronously by `run()`
//! - [`CaughtPanic`] - A caught panic from a listener or transformer

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The pipeline stage a [`ConsumerError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// The receive call to the queue service failed.
    Connection,
    /// A message body could not be converted.
    Transform,
    /// A message listener failed while handling a delivered message.
    Listener,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::Connection => "connection",
            FailureStage::Transform => "transform",
            FailureStage::Listener => "listener",
        })
    }
}

/// A failure raised inside the polling pipeline, tagged by its stage.
///
/// Each variant wraps exactly one originating failure. The wrapped error is
/// kept as-is so callers can downcast it or walk its `source()` chain.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// The receive call failed; the batch for this tick was abandoned.
    #[error("failed to receive messages: {0}")]
    Connection(#[source] BoxError),

    /// One message body could not be transformed; only that message was dropped.
    #[error("failed to transform message body: {0}")]
    Transform(#[source] BoxError),

    /// A listener failed while handling one message.
    #[error("message listener failed: {0}")]
    Listener(#[source] BoxError),
}

impl ConsumerError {
    /// Wrap a failed receive call.
    pub fn connection(caught: impl Into<BoxError>) -> Self {
        ConsumerError::Connection(caught.into())
    }

    /// Wrap a failed body transformation.
    pub fn transform(caught: impl Into<BoxError>) -> Self {
        ConsumerError::Transform(caught.into())
    }

    /// Wrap a failed listener invocation.
    pub fn listener(caught: impl Into<BoxError>) -> Self {
        ConsumerError::Listener(caught.into())
    }

    /// The stage that produced this failure.
    pub fn kind(&self) -> FailureStage {
        match self {
            ConsumerError::Connection(_) => FailureStage::Connection,
            ConsumerError::Transform(_) => FailureStage::Transform,
            ConsumerError::Listener(_) => FailureStage::Listener,
        }
    }

    /// The originating failure, exactly as it was caught.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match self {
            ConsumerError::Connection(e) | ConsumerError::Transform(e) | ConsumerError::Listener(e) => {
                e.as_ref()
            }
        }
    }

    /// Consume the wrapper and return the originating failure.
    pub fn into_inner(self) -> BoxError {
        match self {
            ConsumerError::Connection(e) | ConsumerError::Transform(e) | ConsumerError::Listener(e) => e,
        }
    }
}

/// Errors that prevent a consumer from starting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No polling interval was configured.
    #[error("polling interval missing: set it with `ConsumerConfig::with_interval`")]
    MissingInterval,

    /// `run()` was called outside of a tokio runtime.
    #[error("no tokio runtime available to schedule polling")]
    NoRuntime,

    /// The interval is too long for the timer to schedule its first tick.
    #[error("polling interval of {0:?} is too large to schedule")]
    IntervalTooLarge(Duration),
}

/// A panic caught while invoking a listener or transformer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("panicked: {message}")]
pub struct CaughtPanic {
    message: String,
}

impl CaughtPanic {
    /// Build from the payload returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_inner_returns_caught_error() {
        let err = ConsumerError::connection(io::Error::new(io::ErrorKind::Other, "message"));
        assert_eq!(err.kind(), FailureStage::Connection);
        assert_eq!(err.inner().to_string(), "message");

        let inner = err.into_inner();
        let io_err = inner.downcast_ref::<io::Error>().expect("should be io::Error");
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(ConsumerError::transform("a").kind(), FailureStage::Transform);
        assert_eq!(ConsumerError::listener("b").kind(), FailureStage::Listener);
        assert_ne!(FailureStage::Transform, FailureStage::Listener);
    }

    #[test]
    fn test_source_chain_is_preserved() {
        let err = ConsumerError::listener("boom");
        let source = err.source().expect("should have source");
        assert_eq!(source.to_string(), "boom");
        assert_eq!(err.to_string(), "message listener failed: boom");
    }

    #[test]
    fn test_panic_payloads() {
        let p = CaughtPanic::from_payload(Box::new("static"));
        assert_eq!(p.message(), "static");
        let p = CaughtPanic::from_payload(Box::new(String::from("owned")));
        assert_eq!(p.message(), "owned");
        let p = CaughtPanic::from_payload(Box::new(42_u8));
        assert_eq!(p.message(), "non-string panic payload");
    }
}
