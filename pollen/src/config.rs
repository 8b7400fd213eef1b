//! Consumer configuration.

use std::time::Duration;

/// Polling interval used by [`ConsumerConfig::for_queue`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration of one consumer.
///
/// `request` is the provider-specific receive request (batch size, wait
/// time, ...) and is passed to the client untouched on every tick.
///
/// # Example
///
/// ```rust
/// use pollen::ConsumerConfig;
/// use pollen::memory::ReceiveRequest;
/// use std::time::Duration;
///
/// let config = ConsumerConfig::new("orders", ReceiveRequest::new(5))
///     .with_interval(Duration::from_millis(250))
///     .with_single_flight(true);
///
/// assert_eq!(config.interval(), Some(Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig<R> {
    queue: String,
    interval: Option<Duration>,
    request: R,
    single_flight: bool,
}

impl<R> ConsumerConfig<R> {
    /// Create a configuration without a polling interval.
    ///
    /// Such a configuration can still drive [`run_once`], but [`run`]
    /// refuses to start until an interval is set.
    ///
    /// [`run_once`]: crate::Consumer::run_once
    /// [`run`]: crate::Consumer::run
    pub fn new(queue: impl Into<String>, request: R) -> Self {
        Self {
            queue: queue.into(),
            interval: None,
            request,
            single_flight: false,
        }
    }

    /// Default configuration for `queue`: default request, 1 second interval.
    pub fn for_queue(queue: impl Into<String>) -> Self
    where
        R: Default,
    {
        Self::new(queue, R::default()).with_interval(DEFAULT_INTERVAL)
    }

    /// Set the polling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Skip timer ticks while the previous one is still running.
    ///
    /// Off by default: a slow tick may then overlap the next one.
    pub fn with_single_flight(mut self, single_flight: bool) -> Self {
        self.single_flight = single_flight;
        self
    }

    /// The queue identity.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The polling interval, if set.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// The provider-specific receive request.
    pub fn request(&self) -> &R {
        &self.request
    }

    /// Whether overlapping timer ticks are skipped.
    pub fn single_flight(&self) -> bool {
        self.single_flight
    }
}
