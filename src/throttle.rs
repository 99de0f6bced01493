//! Fixed request delay
//!
//! Trakt throttles bursts of unauthenticated requests, so every outbound call
//! (API and image downloads alike) waits a fixed delay first. Calls are made
//! one after another on a single thread, so two requests never overlap.

use std::thread;
use std::time::Duration;

/// Sleeps a fixed delay before each outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestThrottle {
    delay: Duration,
}

impl RequestThrottle {
    /// Creates a throttle with the given delay
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A throttle that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Blocks the current thread for the configured delay
    pub fn wait(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}
