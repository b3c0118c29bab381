//! Subscription types for live event delivery.

use crate::config::{RelayConfig, DEFAULT_BUFFER_SIZE, DEFAULT_POLL_INTERVAL_MS};
use std::fmt;
use std::time::Duration;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a delivery engine. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Created, cursor not yet positioned.
    Init,
    /// Polling the log.
    Open,
    /// No further polling or delivery.
    Closed,
}

/// Per-subscription settings.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Delay between two ticks.
    /// Default: 200ms
    pub poll_interval: Duration,

    /// Max events waiting in the output buffer.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl From<&RelayConfig> for SubscriptionConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            buffer_size: config.buffer_size,
        }
    }
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Events read from the log past the cursor.
    pub scanned: usize,
    /// Matching events handed to the output buffer.
    pub delivered: usize,
    /// The output buffer filled up; the remaining events wait for the
    /// next tick.
    pub deferred: bool,
}
