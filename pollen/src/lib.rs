//! # pollen - Polling Message-Queue Consumer
//!
//! `pollen` repeatedly pulls batches of messages from a remote queue service,
//! converts each raw body into a typed value, and fans every message out to
//! the registered listeners. Failures are isolated per stage and routed to
//! a separate set of error listeners instead of stopping the consumer.
//!
//! ## Quick Start
//!
//! ```rust
//! use pollen::prelude::*;
//! use pollen::memory::{InMemoryQueue, ReceiveRequest};
//! use pollen::listeners::LoggingListener;
//! use std::sync::Arc;
//!
//! #[derive(serde::Deserialize)]
//! struct Order {
//!     id: u64,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = Arc::new(InMemoryQueue::new("orders"));
//! queue.push(r#"{"id": 7}"#);
//!
//! let consumer = Consumer::<_, Order>::json(
//!     queue.clone(),
//!     ConsumerConfig::new("orders", ReceiveRequest::default()),
//! );
//! consumer.on_error().listen(LoggingListener::named("orders"));
//! consumer.on_message().listen(
//!     |m: &QueueMessage<InMemoryQueue, Order>| -> Result<(), BoxError> {
//!         assert_eq!(m.body().id, 7);
//!         Ok(())
//!     },
//! );
//!
//! consumer.run_once().await;
//! # }
//! ```
//!
//! ## Pipeline
//!
//! Each tick of a [`Consumer`] runs receive, transform and dispatch. A
//! failure in any stage becomes a [`ConsumerError`] tagged with its
//! [`FailureStage`]:
//!
//! | Stage        | Effect                                         |
//! |--------------|------------------------------------------------|
//! | `Connection` | the tick's batch is abandoned                  |
//! | `Transform`  | only the offending message is dropped          |
//! | `Listener`   | the remaining listeners still see the message  |
//!
//! ## Binding a handler
//!
//! [`QueueListener`] attaches one handler to a consumer, deletes messages
//! according to a [`DeletionPolicy`], and starts polling.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod config;
mod consumer;
mod registration;

pub use pollen_core::{
    // Errors
    BoxError,
    CaughtPanic,
    ConfigError,
    ConsumerError,
    // Listeners
    DynListener,
    EventDispatcher,
    FailureStage,
    Listener,
    ListenerRef,
    // Queue service
    QueueClient,
    QueueMessage,
    RawMessage,
    Transform,
};

pub use config::{ConsumerConfig, DEFAULT_INTERVAL};
pub use consumer::{Consumer, WeakConsumer};
pub use registration::{
    ConsumerDropped, ConsumerSource, DeletionPolicy, MessageHandler, QueueListener, Registration,
};

/// In-memory queue service.
pub mod memory {
    #![allow(clippy::wildcard_imports)]
    pub use pollen_std::memory::*;
}

/// Standard listener implementations.
pub mod listeners {
    #![allow(clippy::wildcard_imports)]
    pub use pollen_std::listeners::*;
}

/// Body transformers.
pub mod transform {
    #![allow(clippy::wildcard_imports)]
    pub use pollen_std::transform::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use pollen_std::testing::*;
}

/// Prelude module - common imports for Pollen.
///
/// # Usage
///
/// ```rust,ignore
/// use pollen::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, ConfigError, Consumer, ConsumerConfig, ConsumerError, ConsumerSource,
        DeletionPolicy, EventDispatcher, FailureStage, Listener, ListenerRef, MessageHandler,
        QueueClient, QueueListener, QueueMessage, RawMessage, Transform,
    };
}
