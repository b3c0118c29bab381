//! # CI Relay
//!
//! Live fan-out of CI test lifecycle events to filtered subscriber streams.
//!
//! ## Core Concepts
//!
//! - **Event log**: Bounded, sequence-ordered, in-memory store of recent events
//! - **Publisher**: Appends run, test and step lifecycle events to the log
//! - **Filters**: Per-kind interest in a repository, jobs and tests
//! - **Subscriptions**: Timer-driven pollers that deliver new matching events
//!   in order, at most once, and never the backlog
//!
//! Memory is bounded by the log capacity regardless of how many subscribers
//! there are or how slowly they read. A subscriber that falls behind eviction
//! silently misses the evicted events.
//!
//! ## Example
//!
//! ```ignore
//! use ci_relay::{Filters, JobId, Relay, RelayConfig, RepositoryId, TestIdentifier};
//!
//! let relay = Relay::new(RelayConfig::default())?;
//!
//! // Streaming endpoint
//! let subscription = relay.subscribe(Filters::repository_runs(RepositoryId(42)))?;
//!
//! // Ingestion handler
//! relay.publisher().begin(RepositoryId(42), JobId(7));
//!
//! for frame in ci_relay::sse::SseFrames::new(subscription) {
//!     write_to_client(frame?);
//! }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod log;
pub mod publisher;
pub mod relay;
pub mod sse;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use filter::{matches, Filter, Filters};
pub use log::EventLog;
pub use publisher::Publisher;
pub use relay::Relay;
pub use subscriptions::{
    DeliveryEngine, Subscription, SubscriptionConfig, SubscriptionId, SubscriptionManager,
    SubscriptionState, TickStats,
};
pub use types::*;
