//! # Consumer Engine
//!
//! A [`Consumer`] polls one queue on a fixed interval. Every tick runs the
//! same pipeline:
//!
//! 1. receive a batch through the [`QueueClient`],
//! 2. transform every raw body into the message type,
//! 3. hand every message to every message listener, in registration order.
//!
//! Failures never escape a tick. Each one is wrapped in a [`ConsumerError`]
//! tagged with its stage and dispatched to the error listeners, then the
//! pipeline moves on.

use crate::config::ConsumerConfig;
use pollen_core::{
    BoxError, CaughtPanic, ConfigError, ConsumerError, EventDispatcher, QueueClient,
    QueueMessage, RawMessage, Transform,
};
use pollen_std::transform::Json;
use serde::de::DeserializeOwned;
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, warn};

/// Shortest period the timer accepts. Shorter intervals are rounded up.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A polling consumer bound to one queue.
///
/// `Consumer` is a cheap handle: clones share the same listeners, timer and
/// configuration. Polling stops when [`stop`](Self::stop) is called or when
/// the last handle is dropped.
///
/// # Example
///
/// ```rust
/// use pollen::{BoxError, Consumer, ConsumerConfig, QueueMessage};
/// use pollen::memory::{InMemoryQueue, ReceiveRequest};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = Arc::new(InMemoryQueue::new("orders"));
/// queue.push("hello");
///
/// let consumer = Consumer::new(
///     queue.clone(),
///     ConsumerConfig::new("orders", ReceiveRequest::default()),
///     |body: &str| -> Result<String, BoxError> { Ok(body.to_uppercase()) },
/// );
/// consumer.on_message().listen(
///     |m: &QueueMessage<InMemoryQueue, String>| -> Result<(), BoxError> {
///         assert_eq!(m.body(), "HELLO");
///         Ok(())
///     },
/// );
///
/// consumer.run_once().await;
/// # }
/// ```
pub struct Consumer<C: QueueClient, T> {
    inner: Arc<Inner<C, T>>,
}

struct Inner<C: QueueClient, T> {
    client: Arc<C>,
    config: ConsumerConfig<C::Request>,
    queue: Arc<str>,
    transform: Arc<dyn Transform<T>>,
    on_message: EventDispatcher<QueueMessage<C, T>>,
    on_error: EventDispatcher<ConsumerError>,
    timer: Mutex<Option<JoinHandle<()>>>,
    in_flight: AtomicBool,
}

impl<C: QueueClient, T> Inner<C, T> {
    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: QueueClient, T> Drop for Inner<C, T> {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

impl<C, T> Consumer<C, T>
where
    C: QueueClient,
    T: Send + Sync + 'static,
{
    /// Create an idle consumer. Nothing is received until [`run`](Self::run)
    /// or [`run_once`](Self::run_once) is called.
    pub fn new(
        client: Arc<C>,
        config: ConsumerConfig<C::Request>,
        transform: impl Transform<T>,
    ) -> Self {
        Self::from_parts(client, config, Arc::new(transform))
    }

    /// Create a consumer that decodes JSON bodies into `T`.
    pub fn json(client: Arc<C>, config: ConsumerConfig<C::Request>) -> Self
    where
        T: DeserializeOwned,
    {
        Self::new(client, config, Json::<T>::new())
    }

    pub(crate) fn from_parts(
        client: Arc<C>,
        config: ConsumerConfig<C::Request>,
        transform: Arc<dyn Transform<T>>,
    ) -> Self {
        let queue = Arc::from(config.queue());
        Self {
            inner: Arc::new(Inner {
                client,
                config,
                queue,
                transform,
                on_message: EventDispatcher::new(),
                on_error: EventDispatcher::new(),
                timer: Mutex::new(None),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Listeners invoked once per successfully transformed message.
    pub fn on_message(&self) -> &EventDispatcher<QueueMessage<C, T>> {
        &self.inner.on_message
    }

    /// Listeners invoked once per pipeline failure.
    pub fn on_error(&self) -> &EventDispatcher<ConsumerError> {
        &self.inner.on_error
    }

    /// The configuration this consumer was built with.
    pub fn config(&self) -> &ConsumerConfig<C::Request> {
        &self.inner.config
    }

    /// The queue service client.
    pub fn client(&self) -> &Arc<C> {
        &self.inner.client
    }

    /// The queue identity.
    pub fn queue(&self) -> &str {
        &self.inner.queue
    }

    /// Start polling.
    ///
    /// The first tick fires one interval after this call, then every
    /// interval until [`stop`](Self::stop). Calling `run` while already
    /// polling does nothing.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingInterval`] if the configuration has no interval.
    /// - [`ConfigError::NoRuntime`] if called outside a tokio runtime.
    /// - [`ConfigError::IntervalTooLarge`] if the first tick lies beyond what
    ///   the clock can represent.
    ///
    /// In every case no timer is started.
    pub fn run(&self) -> Result<(), ConfigError> {
        let interval = self
            .inner
            .config
            .interval()
            .ok_or(ConfigError::MissingInterval)?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let mut timer = self.inner.timer();
        if timer.is_some() {
            debug!(queue = %self.queue(), "consumer already polling");
            return Ok(());
        }

        let period = interval.max(MIN_PERIOD);
        let start = Instant::now()
            .checked_add(period)
            .ok_or(ConfigError::IntervalTooLarge(period))?;
        *timer = Some(runtime.spawn(poll(Arc::downgrade(&self.inner), start, period)));
        debug!(queue = %self.queue(), interval = ?period, "consumer polling started");
        Ok(())
    }

    /// Stop polling. Idempotent.
    ///
    /// Cancels the timer only: a tick that is already running finishes its
    /// current batch.
    pub fn stop(&self) {
        if let Some(handle) = self.inner.timer().take() {
            handle.abort();
            debug!(queue = %self.queue(), "consumer polling stopped");
        }
    }

    /// Whether the polling timer is active.
    pub fn is_polling(&self) -> bool {
        self.inner.timer().is_some()
    }

    /// Run one receive / transform / dispatch cycle now.
    ///
    /// This is exactly what every timer tick does. It never fails: every
    /// failure is routed to the error listeners.
    pub async fn run_once(&self) {
        let inner = &self.inner;

        let batch = match inner.client.receive(&inner.queue, inner.config.request()).await {
            Ok(batch) => batch.unwrap_or_default(),
            Err(e) => {
                self.emit_error(ConsumerError::connection(e)).await;
                return;
            }
        };
        if batch.is_empty() {
            return;
        }
        debug!(queue = %inner.queue, received = batch.len(), "received batch");

        let mut messages = Vec::with_capacity(batch.len());
        for raw in batch {
            match self.transform(&raw) {
                Ok(body) => messages.push(QueueMessage::new(
                    Arc::clone(&inner.client),
                    Arc::clone(&inner.queue),
                    raw,
                    body,
                )),
                Err(e) => {
                    debug!(queue = %inner.queue, receipt = raw.receipt(), "skipping message");
                    self.emit_error(ConsumerError::transform(e)).await;
                }
            }
        }

        for message in &messages {
            for listener in inner.on_message.snapshot() {
                if let Err(e) = listener.call(message).await {
                    self.emit_error(ConsumerError::listener(e)).await;
                }
            }
        }
        debug!(queue = %inner.queue, delivered = messages.len(), "batch dispatched");
    }

    /// A handle that does not keep the consumer alive.
    pub fn downgrade(&self) -> WeakConsumer<C, T> {
        WeakConsumer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    async fn tick(&self) {
        if !self.inner.config.single_flight() {
            self.run_once().await;
            return;
        }
        if self.inner.in_flight.swap(true, Ordering::AcqRel) {
            debug!(queue = %self.queue(), "previous tick still running, skipping");
            return;
        }
        let _guard = InFlight(&self.inner.in_flight);
        self.run_once().await;
    }

    fn transform(&self, raw: &C::Raw) -> Result<T, BoxError> {
        let body = raw.body();
        panic::catch_unwind(AssertUnwindSafe(|| self.inner.transform.transform(body)))
            .unwrap_or_else(|payload| Err(Box::new(CaughtPanic::from_payload(payload))))
    }

    async fn emit_error(&self, error: ConsumerError) {
        warn!(queue = %self.queue(), stage = %error.kind(), error = %error, "consumer failure");
        for failure in self.inner.on_error.dispatch(&error).await {
            error!(queue = %self.queue(), error = %failure, "error listener failed");
        }
    }
}

async fn poll<C, T>(inner: Weak<Inner<C, T>>, start: Instant, period: Duration)
where
    C: QueueClient,
    T: Send + Sync + 'static,
{
    let mut ticks = time::interval_at(start, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let consumer = Consumer { inner };
        tokio::spawn(async move { consumer.tick().await });
    }
}

/// Clears the single-flight flag when a tick ends, including by panic.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: QueueClient, T> Clone for Consumer<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: QueueClient, T> fmt::Debug for Consumer<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("queue", &self.inner.queue)
            .field("polling", &self.inner.timer().is_some())
            .field("on_message", &self.inner.on_message)
            .field("on_error", &self.inner.on_error)
            .finish()
    }
}

/// A non-owning [`Consumer`] handle.
pub struct WeakConsumer<C: QueueClient, T> {
    inner: Weak<Inner<C, T>>,
}

impl<C: QueueClient, T> WeakConsumer<C, T> {
    /// The consumer, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Consumer<C, T>> {
        self.inner.upgrade().map(|inner| Consumer { inner })
    }
}

impl<C: QueueClient, T> Clone for WeakConsumer<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<C: QueueClient, T> fmt::Debug for WeakConsumer<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakConsumer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
