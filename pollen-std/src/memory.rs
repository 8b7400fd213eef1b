//! In-memory queue client for testing and single-process scenarios.
//!
//! [`InMemoryQueue`] implements [`QueueClient`] over a shared, named queue:
//! - Thread-safe (can be shared across threads via `Clone`)
//! - Received messages move in flight under a fresh receipt token
//! - Deletes and visibility changes are recorded for inspection
//! - Receive failures can be scripted with [`InMemoryQueue::fail_next_receive`]

use pollen_core::{QueueClient, RawMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Receive parameters for [`InMemoryQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Maximum number of messages returned by one receive call.
    pub max_messages: usize,
}

impl Default for ReceiveRequest {
    fn default() -> Self {
        Self { max_messages: 10 }
    }
}

impl ReceiveRequest {
    /// Receive up to `max_messages` per call.
    pub fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }
}

/// A message delivered by [`InMemoryQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMessage {
    /// Stable message id, assigned on push.
    pub id: String,
    /// Message body.
    pub body: String,
    /// Receipt token of this delivery.
    pub receipt: String,
    /// How many times this message has been received.
    pub receive_count: u32,
}

impl RawMessage for MemoryMessage {
    fn body(&self) -> &str {
        &self.body
    }

    fn receipt(&self) -> &str {
        &self.receipt
    }
}

/// Errors returned by [`InMemoryQueue`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryQueueError {
    /// The call targeted a queue other than this one.
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// No in-flight message carries this receipt.
    #[error("receipt handle is invalid: {0}")]
    InvalidReceipt(String),

    /// A receive failure scripted with `fail_next_receive`.
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Default)]
struct State {
    pending: VecDeque<(String, String, u32)>,
    in_flight: HashMap<String, (String, String, u32)>,
    deleted: Vec<String>,
    visibility: Vec<(String, u32)>,
    failures: VecDeque<String>,
    receives: usize,
    next_id: u64,
    next_receipt: u64,
}

/// In-memory queue client.
///
/// ## Example
///
/// ```
/// use pollen_core::{QueueClient, RawMessage};
/// use pollen_std::memory::{InMemoryQueue, ReceiveRequest};
///
/// # futures::executor::block_on(async {
/// let queue = InMemoryQueue::new("orders");
/// queue.push(r#"{"id":1}"#);
///
/// let batch = queue.receive("orders", &ReceiveRequest::default()).await.unwrap().unwrap();
/// assert_eq!(batch[0].body(), r#"{"id":1}"#);
///
/// queue.delete("orders", batch[0].receipt()).await.unwrap();
/// assert_eq!(queue.deleted(), vec![batch[0].receipt().to_string()]);
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryQueue {
    name: Arc<str>,
    state: Arc<Mutex<State>>,
}

impl InMemoryQueue {
    /// Create an empty queue identified by `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// The queue identity accepted by this client.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a message and return its id.
    pub fn push(&self, body: impl Into<String>) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("msg-{}", state.next_id);
        state.pending.push_back((id.clone(), body.into(), 0));
        id
    }

    /// Make the next receive call fail with `message`.
    ///
    /// Calls stack: each scripted failure is consumed by one receive.
    pub fn fail_next_receive(&self, message: impl Into<String>) {
        self.state().failures.push_back(message.into());
    }

    /// Receipts passed to successful delete calls, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// `(receipt, timeout_secs)` of successful change-visibility calls.
    pub fn visibility_changes(&self) -> Vec<(String, u32)> {
        self.state().visibility.clone()
    }

    /// Number of receive calls, failed ones included.
    pub fn receive_count(&self) -> usize {
        self.state().receives
    }

    /// Messages waiting to be received.
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// Messages received but neither deleted nor released.
    pub fn in_flight_len(&self) -> usize {
        self.state().in_flight.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_queue(&self, queue: &str) -> Result<(), MemoryQueueError> {
        if queue == &*self.name {
            Ok(())
        } else {
            Err(MemoryQueueError::QueueNotFound(queue.to_string()))
        }
    }
}

impl QueueClient for InMemoryQueue {
    type Request = ReceiveRequest;
    type Raw = MemoryMessage;
    type Ack = ();
    type Error = MemoryQueueError;

    async fn receive(
        &self,
        queue: &str,
        request: &ReceiveRequest,
    ) -> Result<Option<Vec<MemoryMessage>>, MemoryQueueError> {
        let mut state = self.state();
        state.receives += 1;
        if let Some(message) = state.failures.pop_front() {
            return Err(MemoryQueueError::Unavailable(message));
        }
        self.check_queue(queue)?;

        if state.pending.is_empty() {
            return Ok(None);
        }

        let take = request.max_messages.min(state.pending.len());
        let drained: Vec<_> = state.pending.drain(..take).collect();
        let mut batch = Vec::with_capacity(take);
        for (id, body, count) in drained {
            state.next_receipt += 1;
            let receipt = format!("{id}#{}", state.next_receipt);
            let count = count + 1;
            state
                .in_flight
                .insert(receipt.clone(), (id.clone(), body.clone(), count));
            batch.push(MemoryMessage {
                id,
                body,
                receipt,
                receive_count: count,
            });
        }
        Ok(Some(batch))
    }

    async fn delete(&self, queue: &str, receipt: &str) -> Result<(), MemoryQueueError> {
        self.check_queue(queue)?;
        let mut state = self.state();
        if state.in_flight.remove(receipt).is_none() {
            return Err(MemoryQueueError::InvalidReceipt(receipt.to_string()));
        }
        state.deleted.push(receipt.to_string());
        Ok(())
    }

    async fn change_visibility(
        &self,
        queue: &str,
        receipt: &str,
        timeout_secs: u32,
    ) -> Result<(), MemoryQueueError> {
        self.check_queue(queue)?;
        let mut state = self.state();
        if !state.in_flight.contains_key(receipt) {
            return Err(MemoryQueueError::InvalidReceipt(receipt.to_string()));
        }
        // There is no clock here: only a zero timeout releases the message.
        if timeout_secs == 0 {
            if let Some(message) = state.in_flight.remove(receipt) {
                state.pending.push_front(message);
            }
        }
        state.visibility.push((receipt.to_string(), timeout_secs));
        Ok(())
    }
}
