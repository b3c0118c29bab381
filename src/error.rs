//! Error types for the relay.

use thiserror::Error;

/// Main error type for relay operations.
///
/// Publishing never fails. Subscribing fails only if the worker thread
/// cannot be started; other errors come from configuration and from
/// encoding events for the wire.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Subscription is closed")]
    SubscriptionClosed,
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Serialization(e.to_string())
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
