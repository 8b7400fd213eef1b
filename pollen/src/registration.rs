//! # Handler Registration
//!
//! [`QueueListener`] binds one handler to a consumer in a single step: it
//! obtains the consumer, attaches a listener that runs the handler and then
//! deletes the message according to a [`DeletionPolicy`], and starts polling.
//!
//! ```rust
//! use pollen::{BoxError, Consumer, ConsumerSource, DeletionPolicy, QueueListener, QueueMessage};
//! use pollen::memory::InMemoryQueue;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), pollen::ConfigError> {
//! let queue = Arc::new(InMemoryQueue::new("orders"));
//!
//! let registration = QueueListener::new(ConsumerSource::<_, u64>::queue(queue, "orders"))
//!     .deletion_policy(DeletionPolicy::OnSuccess)
//!     .bind(
//!         |message: &QueueMessage<InMemoryQueue, u64>,
//!          _: &Consumer<InMemoryQueue, u64>|
//!          -> Result<(), BoxError> {
//!             println!("order {}", message.body());
//!             Ok(())
//!         },
//!     )?;
//!
//! registration.stop();
//! # Ok(())
//! # }
//! ```

use crate::{
    config::ConsumerConfig,
    consumer::{Consumer, WeakConsumer},
};
use pollen_core::{
    BoxError, ConfigError, Listener, ListenerRef, QueueClient, QueueMessage, Transform,
};
use pollen_std::transform::Json;
use serde::de::DeserializeOwned;
use std::{fmt, future::Future, sync::Arc};
use thiserror::Error;
use tracing::warn;

/// When a bound handler's message is deleted from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeletionPolicy {
    /// Delete only after the handler succeeded. Failed messages become
    /// visible again once their visibility timeout expires.
    #[default]
    OnSuccess,
    /// Delete after every handler run, successful or not.
    Always,
    /// Never delete; the handler acknowledges messages itself.
    Never,
}

impl DeletionPolicy {
    /// Whether a message should be deleted given the handler outcome.
    pub fn deletes(self, handled: bool) -> bool {
        match self {
            DeletionPolicy::OnSuccess => handled,
            DeletionPolicy::Always => true,
            DeletionPolicy::Never => false,
        }
    }
}

/// A handler bound through [`QueueListener::bind`].
///
/// Receives the message and the consumer that delivered it. Synchronous
/// closures `Fn(&QueueMessage<C, T>, &Consumer<C, T>) -> Result<(), BoxError>`
/// are handlers out of the box.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `MessageHandler`",
    note = "Closures must have the signature `Fn(&QueueMessage<C, T>, &Consumer<C, T>) -> Result<(), BoxError>`."
)]
pub trait MessageHandler<C: QueueClient, T>: Send + Sync + 'static {
    /// Handle one message.
    fn handle(
        &self,
        message: &QueueMessage<C, T>,
        consumer: &Consumer<C, T>,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<C, T, F> MessageHandler<C, T> for F
where
    C: QueueClient,
    T: Send + Sync + 'static,
    F: Fn(&QueueMessage<C, T>, &Consumer<C, T>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn handle(
        &self,
        message: &QueueMessage<C, T>,
        consumer: &Consumer<C, T>,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        futures::future::lazy(move |_| (self)(message, consumer))
    }
}

/// Where a [`QueueListener`] gets its consumer from.
pub enum ConsumerSource<C: QueueClient, T> {
    /// Reuse an existing consumer. It may already be polling.
    Consumer(Consumer<C, T>),
    /// Build a new consumer.
    Config {
        /// The queue service client.
        client: Arc<C>,
        /// The consumer configuration.
        config: ConsumerConfig<C::Request>,
        /// The body transformer.
        transform: Arc<dyn Transform<T>>,
    },
}

impl<C, T> ConsumerSource<C, T>
where
    C: QueueClient,
    T: Send + Sync + 'static,
{
    /// Build a new consumer with an explicit transformer.
    pub fn new(
        client: Arc<C>,
        config: ConsumerConfig<C::Request>,
        transform: impl Transform<T>,
    ) -> Self {
        ConsumerSource::Config {
            client,
            config,
            transform: Arc::new(transform),
        }
    }

    /// Build a new consumer decoding JSON bodies.
    pub fn config(client: Arc<C>, config: ConsumerConfig<C::Request>) -> Self
    where
        T: DeserializeOwned,
    {
        Self::new(client, config, Json::<T>::new())
    }

    /// Build a new consumer for `queue` with the default request, a
    /// 1 second interval and JSON bodies.
    pub fn queue(client: Arc<C>, queue: impl Into<String>) -> Self
    where
        T: DeserializeOwned,
        C::Request: Default,
    {
        Self::config(client, ConsumerConfig::for_queue(queue))
    }

    /// Replace the transformer of a consumer still to be built.
    ///
    /// Has no effect on an existing consumer, which keeps its own.
    pub fn with_transform(self, transform: impl Transform<T>) -> Self {
        match self {
            ConsumerSource::Config { client, config, .. } => ConsumerSource::Config {
                client,
                config,
                transform: Arc::new(transform),
            },
            existing @ ConsumerSource::Consumer(_) => existing,
        }
    }

    fn into_consumer(self) -> Consumer<C, T> {
        match self {
            ConsumerSource::Consumer(consumer) => consumer,
            ConsumerSource::Config {
                client,
                config,
                transform,
            } => Consumer::from_parts(client, config, transform),
        }
    }
}

impl<C: QueueClient, T> From<Consumer<C, T>> for ConsumerSource<C, T> {
    fn from(consumer: Consumer<C, T>) -> Self {
        ConsumerSource::Consumer(consumer)
    }
}

/// Builder binding one handler to a consumer.
pub struct QueueListener<C: QueueClient, T> {
    source: ConsumerSource<C, T>,
    policy: DeletionPolicy,
}

impl<C, T> QueueListener<C, T>
where
    C: QueueClient,
    T: Send + Sync + 'static,
{
    /// Start a binding from `source`, with [`DeletionPolicy::OnSuccess`].
    pub fn new(source: impl Into<ConsumerSource<C, T>>) -> Self {
        Self {
            source: source.into(),
            policy: DeletionPolicy::default(),
        }
    }

    /// Set the deletion policy.
    pub fn deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach `handler` as one message listener and start polling.
    ///
    /// The consumer keeps polling as long as the returned [`Registration`]
    /// (or another handle to the consumer) is alive.
    ///
    /// # Errors
    ///
    /// Fails when the consumer cannot start, see [`Consumer::run`]. The
    /// listener is detached again in that case.
    pub fn bind<H>(self, handler: H) -> Result<Registration<C, T>, ConfigError>
    where
        H: MessageHandler<C, T>,
    {
        let consumer = self.source.into_consumer();
        let listener = consumer.on_message().listen(PolicyListener {
            handler,
            policy: self.policy,
            consumer: consumer.downgrade(),
        });

        if let Err(e) = consumer.run() {
            consumer.on_message().remove(&listener);
            return Err(e);
        }
        Ok(Registration { consumer, listener })
    }
}

/// A bound handler attached to a running consumer.
pub struct Registration<C: QueueClient, T> {
    consumer: Consumer<C, T>,
    listener: ListenerRef<QueueMessage<C, T>>,
}

impl<C, T> Registration<C, T>
where
    C: QueueClient,
    T: Send + Sync + 'static,
{
    /// The consumer the handler is attached to.
    pub fn consumer(&self) -> &Consumer<C, T> {
        &self.consumer
    }

    /// The listener wrapping the handler.
    pub fn listener(&self) -> &ListenerRef<QueueMessage<C, T>> {
        &self.listener
    }

    /// Stop the consumer's polling timer.
    pub fn stop(&self) {
        self.consumer.stop();
    }

    /// Detach the handler, leaving the consumer and its other listeners as they are.
    pub fn unregister(self) -> Consumer<C, T> {
        self.consumer.on_message().remove(&self.listener);
        self.consumer
    }
}

impl<C: QueueClient, T> fmt::Debug for Registration<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("consumer", &self.consumer)
            .field("listener", &self.listener)
            .finish()
    }
}

/// Raised when a bound handler runs after its consumer was dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("consumer was dropped before the handler ran")]
pub struct ConsumerDropped;

struct PolicyListener<C: QueueClient, T, H> {
    handler: H,
    policy: DeletionPolicy,
    consumer: WeakConsumer<C, T>,
}

impl<C, T, H> Listener<QueueMessage<C, T>> for PolicyListener<C, T, H>
where
    C: QueueClient,
    T: Send + Sync + 'static,
    H: MessageHandler<C, T>,
{
    async fn on_event(&self, message: &QueueMessage<C, T>) -> Result<(), BoxError> {
        let consumer = self.consumer.upgrade().ok_or(ConsumerDropped)?;

        match self.handler.handle(message, &consumer).await {
            Ok(()) => {
                if self.policy.deletes(true) {
                    message.acknowledge().await?;
                }
                Ok(())
            }
            Err(e) => {
                if self.policy.deletes(false)
                    && let Err(ack) = message.acknowledge().await
                {
                    warn!(
                        queue = %message.queue(),
                        receipt = %message.receipt(),
                        error = %ack,
                        "failed to delete message after handler failure"
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_truth_table() {
        assert!(DeletionPolicy::OnSuccess.deletes(true));
        assert!(!DeletionPolicy::OnSuccess.deletes(false));
        assert!(DeletionPolicy::Always.deletes(true));
        assert!(DeletionPolicy::Always.deletes(false));
        assert!(!DeletionPolicy::Never.deletes(true));
        assert!(!DeletionPolicy::Never.deletes(false));
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(DeletionPolicy::default(), DeletionPolicy::OnSuccess);
    }
}
