//! Client timing and capacity options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use moonraker_bridge::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_request_timeout(Duration::from_secs(10))
//!     .with_reconnect_delay(Duration::from_secs(2));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::transport::queue::DEFAULT_QUEUE_CAPACITY;

// ============================================================================
// Constants
// ============================================================================

/// Default time a request waits for its reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause between a lost session and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default limit on opening the websocket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause between klippy readiness polls.
pub const DEFAULT_KLIPPY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of polls between "still waiting" log lines (about 5 minutes).
pub const DEFAULT_KLIPPY_LOG_EVERY: u32 = 150;

// ============================================================================
// ClientOptions
// ============================================================================

/// Timing and capacity settings for [`MoonrakerClient`](crate::MoonrakerClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// How long [`send`](crate::MoonrakerClient::send) waits for a reply.
    pub request_timeout: Duration,

    /// Fixed delay before reconnecting.
    pub reconnect_delay: Duration,

    /// Limit on the websocket opening handshake.
    pub connect_timeout: Duration,

    /// Delay between `server.info` polls while klippy is not ready.
    pub klippy_poll_interval: Duration,

    /// Log every Nth poll while waiting for klippy.
    pub klippy_log_every: u32,

    /// Notification queue capacity per session.
    pub queue_capacity: usize,
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            klippy_poll_interval: DEFAULT_KLIPPY_POLL_INTERVAL,
            klippy_log_every: DEFAULT_KLIPPY_LOG_EVERY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the request timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the klippy poll interval.
    #[inline]
    #[must_use]
    pub fn with_klippy_poll_interval(mut self, interval: Duration) -> Self {
        self.klippy_poll_interval = interval;
        self
    }

    /// Logs every `polls`-th klippy poll. Zero is raised to one.
    #[inline]
    #[must_use]
    pub fn with_klippy_log_every(mut self, polls: u32) -> Self {
        self.klippy_log_every = polls.max(1);
        self
    }

    /// Sets the notification queue capacity.
    #[inline]
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert_eq!(options.reconnect_delay, Duration::from_secs(5));
        assert_eq!(options.klippy_poll_interval, Duration::from_secs(2));
        assert_eq!(options.klippy_log_every, 150);
        assert_eq!(options.queue_capacity, 20_000);
    }

    #[test]
    fn test_const_new_matches_default() {
        const OPTIONS: ClientOptions = ClientOptions::new();
        assert_eq!(OPTIONS, ClientOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = ClientOptions::new()
            .with_request_timeout(Duration::from_millis(200))
            .with_reconnect_delay(Duration::from_millis(50))
            .with_connect_timeout(Duration::from_secs(1))
            .with_klippy_poll_interval(Duration::from_millis(10))
            .with_queue_capacity(4);

        assert_eq!(options.request_timeout, Duration::from_millis(200));
        assert_eq!(options.reconnect_delay, Duration::from_millis(50));
        assert_eq!(options.connect_timeout, Duration::from_secs(1));
        assert_eq!(options.klippy_poll_interval, Duration::from_millis(10));
        assert_eq!(options.queue_capacity, 4);
    }

    #[test]
    fn test_log_every_zero_is_raised() {
        assert_eq!(ClientOptions::new().with_klippy_log_every(0).klippy_log_every, 1);
    }
}
