#![allow(dead_code)]

use pollen::memory::{InMemoryQueue, MemoryMessage, MemoryQueueError, ReceiveRequest};
use pollen::testing::RecordingListener;
use pollen::{
    BoxError, Consumer, ConsumerConfig, ConsumerError, FailureStage, QueueClient, QueueMessage,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// ============================================================================
// Fixtures
// ============================================================================

pub const QUEUE: &str = "orders";

pub type Message = QueueMessage<InMemoryQueue, String>;
pub type Upper = Consumer<InMemoryQueue, String>;

pub fn queue() -> Arc<InMemoryQueue> {
    Arc::new(InMemoryQueue::new(QUEUE))
}

/// Uppercases bodies; the body `bad` cannot be transformed.
pub fn uppercase(body: &str) -> Result<String, BoxError> {
    if body == "bad" {
        return Err("unreadable body".into());
    }
    Ok(body.to_uppercase())
}

pub fn config() -> ConsumerConfig<ReceiveRequest> {
    ConsumerConfig::new(QUEUE, ReceiveRequest::default())
}

pub fn polling_config(interval_ms: u64) -> ConsumerConfig<ReceiveRequest> {
    config().with_interval(Duration::from_millis(interval_ms))
}

pub fn upper_consumer(queue: &Arc<InMemoryQueue>) -> Upper {
    Consumer::new(queue.clone(), config(), uppercase)
}

/// Records `(stage, inner message)` of every failure reported by `consumer`.
pub fn record_errors<C, T>(consumer: &Consumer<C, T>) -> RecordingListener<ConsumerError, (FailureStage, String)>
where
    C: QueueClient,
    T: Send + Sync + 'static,
{
    let recorder = RecordingListener::new(|e: &ConsumerError| (e.kind(), e.inner().to_string()));
    consumer.on_error().listen(recorder.clone());
    recorder
}

/// Records the body of every delivered message.
pub fn record_bodies(consumer: &Upper) -> RecordingListener<Message, String> {
    let recorder = RecordingListener::new(|m: &Message| m.body().clone());
    consumer.on_message().listen(recorder.clone());
    recorder
}

// ============================================================================
// Slow Queue
// ============================================================================

/// An [`InMemoryQueue`] whose receive call takes `delay`.
pub struct SlowQueue {
    pub inner: InMemoryQueue,
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryQueue::new(QUEUE),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    /// Receive calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QueueClient for SlowQueue {
    type Request = ReceiveRequest;
    type Raw = MemoryMessage;
    type Ack = ();
    type Error = MemoryQueueError;

    async fn receive(
        &self,
        queue: &str,
        request: &ReceiveRequest,
    ) -> Result<Option<Vec<MemoryMessage>>, MemoryQueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.receive(queue, request).await
    }

    async fn delete(&self, queue: &str, receipt: &str) -> Result<(), MemoryQueueError> {
        self.inner.delete(queue, receipt).await
    }

    async fn change_visibility(
        &self,
        queue: &str,
        receipt: &str,
        timeout_secs: u32,
    ) -> Result<(), MemoryQueueError> {
        self.inner.change_visibility(queue, receipt, timeout_secs).await
    }
}
