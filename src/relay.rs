//! Main Relay struct tying the log, publisher and subscriptions together.

use crate::config::RelayConfig;
use crate::error::Result;
use crate::filter::Filters;
use crate::log::EventLog;
use crate::publisher::Publisher;
use crate::subscriptions::{Subscription, SubscriptionConfig, SubscriptionManager};
use crate::types::{Event, EventKind, JobId, Payload, RepositoryId};
use std::sync::Arc;
use tracing::info;

/// The live event relay.
///
/// Owns the process-wide event log. Ingestion handlers publish into it;
/// streaming endpoints subscribe with filters and forward what they get.
/// Dropping the relay closes every open subscription.
pub struct Relay {
    config: RelayConfig,
    log: Arc<EventLog>,
    publisher: Publisher,
    subscriptions: SubscriptionManager,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        let log = Arc::new(EventLog::new(config.max_log_size));
        let publisher = Publisher::new(Arc::clone(&log));
        let subscriptions =
            SubscriptionManager::new(Arc::clone(&log), SubscriptionConfig::from(&config));

        info!(
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            max_log_size = config.max_log_size,
            buffer_size = config.buffer_size,
            "Relay started"
        );

        Ok(Self {
            config,
            log,
            publisher,
            subscriptions,
        })
    }

    /// Relay configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(RelayConfig::from_env()?)
    }

    /// Publish an event. Never blocks, never fails.
    pub fn publish(
        &self,
        kind: EventKind,
        repository_id: RepositoryId,
        job_id: Option<JobId>,
        payload: Payload,
    ) -> Event {
        self.publisher.publish(kind, repository_id, job_id, payload)
    }

    /// A publisher handle for ingestion handlers.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Subscribe to future events accepted by `filters`.
    pub fn subscribe(&self, filters: Filters) -> Result<Subscription> {
        self.subscriptions.subscribe(filters)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Close all subscriptions. Publishing keeps working.
    pub fn shutdown(&self) {
        self.subscriptions.shutdown();
    }
}
