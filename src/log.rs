//! Bounded, in-memory event log.

use crate::types::{Event, EventKind, JobId, Payload, RepositoryId, Sequence, Timestamp};
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

/// Default number of events retained before the oldest are evicted.
pub const DEFAULT_MAX_LOG_SIZE: usize = 10_000;

struct LogInner {
    /// Retained events, oldest first. Sequences are contiguous.
    events: VecDeque<Event>,
    /// Sequence of the most recently appended event.
    tail: Sequence,
}

/// Append-only event log with a hard capacity.
///
/// One instance is shared by every publisher and subscription. Appends
/// take the write lock; snapshots take the read lock and copy out, so a
/// reader sees an event entirely or not at all.
pub struct EventLog {
    inner: RwLock<LogInner>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log holding at most `capacity` events.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(LogInner {
                events: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_LOG_SIZE)),
                tail: Sequence::ZERO,
            }),
            capacity,
        }
    }

    /// Append an event at the tail, evicting from the head past capacity.
    pub fn append(
        &self,
        kind: EventKind,
        repository_id: RepositoryId,
        job_id: Option<JobId>,
        payload: Payload,
    ) -> Event {
        let mut inner = self.inner.write();

        let sequence = inner.tail.next();
        let event = Event {
            sequence,
            kind,
            repository_id,
            job_id,
            payload,
            published_at: Timestamp::now(),
        };

        inner.tail = sequence;
        inner.events.push_back(event.clone());

        if inner.events.len() > self.capacity {
            let excess = inner.events.len() - self.capacity;
            inner.events.drain(..excess);
            debug!(
                evicted = excess,
                retained = inner.events.len(),
                "Trimmed event log"
            );
        }

        event
    }

    /// All retained events with `sequence > cursor`, oldest first.
    ///
    /// Evicted events are simply absent.
    pub fn snapshot_from(&self, cursor: Sequence) -> Vec<Event> {
        let inner = self.inner.read();

        let Some(first) = inner.events.front() else {
            return Vec::new();
        };

        // Sequences are contiguous, so the offset of `cursor + 1` is direct.
        let skip = cursor.0.saturating_sub(first.sequence.0 - 1);
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        inner.events.iter().skip(skip).cloned().collect()
    }

    /// Highest sequence ever appended (zero if nothing has been).
    pub fn current_tail(&self) -> Sequence {
        self.inner.read().tail
    }

    /// Smallest retained sequence, if any.
    pub fn oldest(&self) -> Option<Sequence> {
        self.inner.read().events.front().map(|e| e.sequence)
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_SIZE)
    }
}
