//! # pollen-core
//!
//! Core traits for the Pollen queue consumer engine.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! queue client implementations and listener libraries that don't need the
//! engine itself.
//!
//! # Building Blocks
//!
//! ## [`EventDispatcher`]
//!
//! A typed, ordered collection of [`Listener`]s for one event type. A
//! consumer owns two of them: one for messages, one for errors.
//!
//! ## [`QueueClient`]
//!
//! The contract the engine needs from the remote queue service: receive a
//! batch, delete a message, change a message's visibility.
//!
//! ## [`QueueMessage`]
//!
//! A received message together with its transformed body and what is needed
//! to acknowledge or delay it.
//!
//! ## [`Transform`]
//!
//! Converts a raw body into the consumer's message type.
//!
//! # Error Types
//!
//! - [`ConsumerError`] - Pipeline failures tagged by [`FailureStage`]
//! - [`ConfigError`] - Startup errors
//! - [`CaughtPanic`] - A caught panic

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod client;
mod dispatcher;
mod error;
mod listener;
mod message;
mod transform;

// Re-exports
pub use client::{QueueClient, RawMessage};
pub use dispatcher::EventDispatcher;
pub use error::{BoxError, CaughtPanic, ConfigError, ConsumerError, FailureStage};
pub use listener::{DynListener, Listener, ListenerRef};
pub use message::QueueMessage;
pub use transform::Transform;
