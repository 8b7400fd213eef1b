//! # pollen-std
//!
//! Standard implementations for the Pollen queue consumer engine.
//!
//! This crate provides:
//! - **Transformers**: [`Json`](transform::Json), [`Utf8`](transform::Utf8)
//! - **Queue clients**: [`InMemoryQueue`](memory::InMemoryQueue)
//! - **Standard listeners**: Logging, Timeout
//! - **Testing utilities**: recording, counting and failing listeners

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use pollen_core;

// Modules
pub mod listeners;
pub mod memory;
pub mod testing;
pub mod transform;
