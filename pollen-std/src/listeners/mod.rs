//! Standard listener implementations.

pub mod logging;
#[cfg(feature = "timeout")]
pub mod timeout;

pub use logging::LoggingListener;
#[cfg(feature = "timeout")]
pub use timeout::{ListenerTimeout, TimeoutListener};
