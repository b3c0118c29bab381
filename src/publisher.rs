//! Producer side: turns CI lifecycle notifications into log events.

use crate::log::EventLog;
use crate::types::{
    Event, EventKind, JobId, Payload, RepositoryId, StepIdentifier, TestIdentifier,
};
use std::sync::Arc;
use tracing::debug;

/// Appends events to the shared log on behalf of ingestion handlers.
///
/// Cheap to clone; every clone writes to the same log. Publishing never
/// blocks on subscribers and never fails.
#[derive(Clone)]
pub struct Publisher {
    log: Arc<EventLog>,
}

impl Publisher {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }

    /// Publish an event of any kind.
    ///
    /// Input is assumed to be validated by the caller.
    pub fn publish(
        &self,
        kind: EventKind,
        repository_id: RepositoryId,
        job_id: Option<JobId>,
        payload: Payload,
    ) -> Event {
        let event = self.log.append(kind, repository_id, job_id, payload);
        debug!(
            sequence = event.sequence.0,
            kind = %event.kind,
            repository = event.repository_id.0,
            job = ?event.job_id,
            "Published event"
        );
        event
    }

    /// A job started reporting.
    pub fn begin(&self, repository_id: RepositoryId, job_id: JobId) -> Event {
        self.publish(EventKind::Begin, repository_id, Some(job_id), Payload::None)
    }

    /// A job finished reporting.
    pub fn end(&self, repository_id: RepositoryId, job_id: JobId) -> Event {
        self.publish(EventKind::End, repository_id, Some(job_id), Payload::None)
    }

    pub fn test_begin(
        &self,
        repository_id: RepositoryId,
        job_id: JobId,
        test: TestIdentifier,
    ) -> Event {
        self.publish(
            EventKind::TestBegin,
            repository_id,
            Some(job_id),
            Payload::Test(test),
        )
    }

    pub fn test_end(
        &self,
        repository_id: RepositoryId,
        job_id: JobId,
        test: TestIdentifier,
    ) -> Event {
        self.publish(
            EventKind::TestEnd,
            repository_id,
            Some(job_id),
            Payload::Test(test),
        )
    }

    pub fn step_begin(
        &self,
        repository_id: RepositoryId,
        job_id: JobId,
        step: StepIdentifier,
    ) -> Event {
        self.publish(
            EventKind::StepBegin,
            repository_id,
            Some(job_id),
            Payload::Step(step),
        )
    }

    /// The log this publisher writes to.
    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }
}
