//! Queue service client contract.
//!
//! The consumer engine talks to the remote queue only through [`QueueClient`].
//! Transport concerns (network calls, authentication, transport-level retries,
//! call timeouts) belong to the implementation.

use std::future::Future;

/// A raw message as returned by the queue service.
///
/// The engine reads the body for transformation and the receipt token for
/// acknowledgement; everything else is passed through unmodified.
pub trait RawMessage: Send + Sync + 'static {
    /// The message body, as sent by the producer.
    fn body(&self) -> &str;

    /// The provider-issued token identifying this delivery of the message.
    fn receipt(&self) -> &str;
}

/// Client for a remote pull-based queue service.
///
/// Implementations might include:
/// - `InMemoryQueue` - For testing and single-process scenarios
/// - An SQS client wrapper
/// - Any broker offering receive / delete / change-visibility semantics
pub trait QueueClient: Send + Sync + 'static {
    /// Provider-specific receive parameters (batch size, wait time, ...).
    type Request: Send + Sync + 'static;
    /// The raw message type returned by [`receive`](QueueClient::receive).
    type Raw: RawMessage;
    /// The provider's acknowledgement for delete / change-visibility calls.
    type Ack: Send + 'static;
    /// The provider's error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Receive a batch of messages from `queue`.
    ///
    /// `Ok(None)` and `Ok(Some(vec![]))` both mean the queue had nothing to
    /// deliver.
    fn receive(
        &self,
        queue: &str,
        request: &Self::Request,
    ) -> impl Future<Output = Result<Option<Vec<Self::Raw>>, Self::Error>> + Send;

    /// Delete one delivered message.
    fn delete(
        &self,
        queue: &str,
        receipt: &str,
    ) -> impl Future<Output = Result<Self::Ack, Self::Error>> + Send;

    /// Change the visibility timeout of one delivered message.
    fn change_visibility(
        &self,
        queue: &str,
        receipt: &str,
        timeout_secs: u32,
    ) -> impl Future<Output = Result<Self::Ack, Self::Error>> + Send;
}
