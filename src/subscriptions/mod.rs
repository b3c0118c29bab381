//! Subscription system for live event delivery.
//!
//! Each subscription owns a [`DeliveryEngine`] driven by its own timer
//! thread. On every tick the engine reads the log past its cursor, applies
//! the subscriber's [`Filters`](crate::Filters) and pushes matches into a
//! bounded buffer that the [`Subscription`] handle drains.
//!
//! Delivery is at-most-once and in sequence order. Events evicted from the
//! log before a lagging subscription ticks are skipped without notice.
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new(log, SubscriptionConfig::default());
//!
//! let subscription = manager.subscribe(Filters::repository_runs(RepositoryId(42)))?;
//!
//! for event in subscription {
//!     println!("{} #{}", event.kind, event.sequence);
//! }
//! ```

mod engine;
mod manager;
mod types;

pub use engine::DeliveryEngine;
pub use manager::{Subscription, SubscriptionManager};
pub use types::{SubscriptionConfig, SubscriptionId, SubscriptionState, TickStats};
