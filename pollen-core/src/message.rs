//! Message handle for received, transformed queue messages.

use crate::client::{QueueClient, RawMessage};
use std::fmt;
use std::sync::Arc;

/// One received message with its transformed body.
///
/// A handle is created once per successfully transformed raw message and is
/// never mutated afterwards. It keeps what is needed to acknowledge or delay
/// the message: the client, the owning queue and the raw message carrying
/// the receipt token.
///
/// Once [`acknowledge`](Self::acknowledge) succeeded, further calls fail on
/// the provider side; the handle does not track this locally.
pub struct QueueMessage<C: QueueClient, T> {
    client: Arc<C>,
    queue: Arc<str>,
    raw: C::Raw,
    body: T,
}

impl<C: QueueClient, T> QueueMessage<C, T> {
    /// Create a new handle.
    pub fn new(client: Arc<C>, queue: Arc<str>, raw: C::Raw, body: T) -> Self {
        Self {
            client,
            queue,
            raw,
            body,
        }
    }

    /// The transformed body.
    pub fn body(&self) -> &T {
        &self.body
    }

    /// The raw provider message, unmodified.
    pub fn raw(&self) -> &C::Raw {
        &self.raw
    }

    /// The identity of the queue this message was received from.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The receipt token of this delivery.
    pub fn receipt(&self) -> &str {
        self.raw.receipt()
    }

    /// Consume the handle and return the transformed body.
    pub fn into_body(self) -> T {
        self.body
    }

    /// Delete the message from its queue.
    ///
    /// Issues exactly one delete call. Provider failures are returned as-is.
    pub async fn acknowledge(&self) -> Result<C::Ack, C::Error> {
        self.client.delete(&self.queue, self.receipt()).await
    }

    /// Change the visibility timeout of the message to `secs` seconds.
    ///
    /// Issues exactly one change-visibility call. Provider failures are
    /// returned as-is.
    pub async fn extend_visibility(&self, secs: u32) -> Result<C::Ack, C::Error> {
        self.client
            .change_visibility(&self.queue, self.receipt(), secs)
            .await
    }
}

impl<C, T> Clone for QueueMessage<C, T>
where
    C: QueueClient,
    C::Raw: Clone,
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            queue: Arc::clone(&self.queue),
            raw: self.raw.clone(),
            body: self.body.clone(),
        }
    }
}

impl<C, T> fmt::Debug for QueueMessage<C, T>
where
    C: QueueClient,
    C::Raw: fmt::Debug,
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueMessage")
            .field("queue", &self.queue)
            .field("raw", &self.raw)
            .field("body", &self.body)
            .finish()
    }
}
