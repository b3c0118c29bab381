//! Subscription filters: which events a subscriber wants to see.

use crate::types::{Event, EventKind, JobId, RepositoryId, TestIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Interest in one kind of event.
///
/// The repository is required. Absent job or identifier sets match anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub repository_id: RepositoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_ids: Option<HashSet<JobId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<HashSet<TestIdentifier>>,
}

impl Filter {
    /// Everything in one repository.
    pub fn repository(repository_id: RepositoryId) -> Self {
        Self {
            repository_id,
            job_ids: None,
            identifiers: None,
        }
    }

    /// Restrict to events from the given jobs.
    pub fn with_jobs(mut self, jobs: impl IntoIterator<Item = JobId>) -> Self {
        self.job_ids = Some(jobs.into_iter().collect());
        self
    }

    /// Restrict to events about the given tests.
    pub fn with_tests(mut self, tests: impl IntoIterator<Item = TestIdentifier>) -> Self {
        self.identifiers = Some(tests.into_iter().collect());
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        matches(event, self)
    }
}

/// Check whether an event satisfies a filter.
pub fn matches(event: &Event, filter: &Filter) -> bool {
    if event.repository_id != filter.repository_id {
        return false;
    }

    if let Some(ref jobs) = filter.job_ids {
        match event.job_id {
            Some(job) if jobs.contains(&job) => {}
            _ => return false,
        }
    }

    if let Some(ref tests) = filter.identifiers {
        match event.payload.test() {
            Some(test) if tests.contains(test) => {}
            _ => return false,
        }
    }

    true
}

/// Per-kind filters for one subscription.
///
/// A kind with no entry is not delivered at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(HashMap<EventKind, Filter>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the filter for one kind.
    pub fn with(mut self, kind: EventKind, filter: Filter) -> Self {
        self.0.insert(kind, filter);
        self
    }

    pub fn insert(&mut self, kind: EventKind, filter: Filter) -> Option<Filter> {
        self.0.insert(kind, filter)
    }

    pub fn get(&self, kind: EventKind) -> Option<&Filter> {
        self.0.get(&kind)
    }

    /// Whether an event should be delivered under these filters.
    pub fn accepts(&self, event: &Event) -> bool {
        self.0
            .get(&event.kind)
            .is_some_and(|filter| matches(event, filter))
    }

    /// Kinds this subscription is interested in.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // --- Presets ---

    /// Runs of a repository starting and finishing.
    pub fn repository_runs(repository_id: RepositoryId) -> Self {
        let filter = Filter::repository(repository_id);
        Self::new()
            .with(EventKind::Begin, filter.clone())
            .with(EventKind::End, filter)
    }

    /// Test progress within the jobs of one workflow run.
    pub fn run_testruns(
        repository_id: RepositoryId,
        jobs: impl IntoIterator<Item = JobId>,
    ) -> Self {
        let filter = Filter::repository(repository_id).with_jobs(jobs);
        Self::new()
            .with(EventKind::Begin, filter.clone())
            .with(EventKind::TestBegin, filter.clone())
            .with(EventKind::TestEnd, filter.clone())
            .with(EventKind::End, filter)
    }

    /// Step progress of one test within the given jobs.
    pub fn test_steps(
        repository_id: RepositoryId,
        jobs: impl IntoIterator<Item = JobId>,
        test: TestIdentifier,
    ) -> Self {
        let filter = Filter::repository(repository_id)
            .with_jobs(jobs)
            .with_tests([test]);
        Self::new()
            .with(EventKind::TestBegin, filter.clone())
            .with(EventKind::StepBegin, filter.clone())
            .with(EventKind::TestEnd, filter)
    }
}

impl FromIterator<(EventKind, Filter)> for Filters {
    fn from_iter<I: IntoIterator<Item = (EventKind, Filter)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
