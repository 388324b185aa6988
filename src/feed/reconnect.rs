//! Reconnection policy: capped exponential backoff.
//!
//! One explicit policy for the whole client: after an unexpected transport
//! drop, the session re-probes with delays that double from the initial value
//! up to a cap, for a bounded number of attempts. Delays are deterministic —
//! a single session per process has nothing to de-synchronize from.

use std::time::Duration;

use crate::constants::timing;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Cap on the backoff delay.
    pub max_delay: Duration,
    /// Attempts before giving up. `0` means never reconnect.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(timing::DEFAULT_RECONNECT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(timing::DEFAULT_RECONNECT_MAX_DELAY_MS),
            max_attempts: timing::DEFAULT_RECONNECT_MAX_ATTEMPTS,
        }
    }
}

/// Stateful backoff iterator over a [`ReconnectConfig`].
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectPolicy {
    /// Create a fresh policy.
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay to wait before the next attempt, or `None` once attempts are
    /// exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let delay = self
            .config
            .initial_delay
            .saturating_mul(1u32 << self.attempt.min(16))
            .min(self.config.max_delay);
        self.attempt += 1;
        Some(delay)
    }

    /// Attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
