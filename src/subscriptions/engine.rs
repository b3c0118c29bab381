//! Per-subscription delivery: scan the log past a cursor, emit matches.

use crate::filter::Filters;
use crate::log::EventLog;
use crate::types::{Event, Sequence};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use tracing::{debug, trace};

use super::types::{SubscriptionId, SubscriptionState, TickStats};

/// Cursor-driven poller for one subscription.
///
/// Every event with `sequence <= cursor` has been delivered or skipped, so
/// eviction from the log never needs to be coordinated with engines.
pub struct DeliveryEngine {
    id: SubscriptionId,
    state: SubscriptionState,
    filters: Filters,
    cursor: Sequence,
    /// Released on close.
    log: Option<Arc<EventLog>>,
    /// Released on close, which ends the subscriber's stream.
    sink: Option<Sender<Event>>,
}

impl DeliveryEngine {
    pub fn new(
        id: SubscriptionId,
        log: Arc<EventLog>,
        filters: Filters,
        sink: Sender<Event>,
    ) -> Self {
        Self {
            id,
            state: SubscriptionState::Init,
            filters,
            cursor: Sequence::ZERO,
            log: Some(log),
            sink: Some(sink),
        }
    }

    /// Skip the backlog and start accepting ticks.
    ///
    /// Only valid from `Init`; returns false otherwise.
    pub fn open(&mut self) -> bool {
        if self.state != SubscriptionState::Init {
            return false;
        }
        let Some(log) = self.log.as_ref() else {
            return false;
        };

        self.cursor = log.current_tail();
        self.state = SubscriptionState::Open;
        true
    }

    /// Deliver every new matching event, in sequence order.
    ///
    /// Never blocks: when the output buffer is full the scan stops and the
    /// cursor stays before the unsent event, so it is retried on the next
    /// tick. A disconnected output closes the engine.
    pub fn tick(&mut self) -> TickStats {
        let mut stats = TickStats::default();

        if self.state != SubscriptionState::Open {
            return stats;
        }
        let (Some(log), Some(sink)) = (self.log.as_ref(), self.sink.as_ref()) else {
            return stats;
        };

        let events = log.snapshot_from(self.cursor);
        stats.scanned = events.len();

        let mut disconnected = false;
        for event in events {
            let sequence = event.sequence;
            debug_assert!(sequence > self.cursor);

            if self.filters.accepts(&event) {
                trace!(subscription = self.id.0, sequence = sequence.0, kind = %event.kind, "Sending event");
                match sink.try_send(event) {
                    Ok(()) => stats.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        stats.deferred = true;
                        break;
                    }
                    Err(TrySendError::Disconnected(_)) => disconnected = true,
                }
            }

            self.cursor = sequence;
            if disconnected {
                break;
            }
        }

        if stats.deferred {
            debug!(
                subscription = self.id.0,
                cursor = self.cursor.0,
                "Output buffer full, resuming next tick"
            );
        }

        if disconnected {
            self.close();
        }

        stats
    }

    /// Stop delivering and release the log and output. Idempotent.
    ///
    /// Returns true if this call performed the transition.
    pub fn close(&mut self) -> bool {
        if self.state == SubscriptionState::Closed {
            return false;
        }
        self.state = SubscriptionState::Closed;
        self.log = None;
        self.sink = None;
        true
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Highest sequence already delivered or skipped.
    pub fn cursor(&self) -> Sequence {
        self.cursor
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::types::{EventKind, JobId, Payload, RepositoryId, TestIdentifier};
    use crossbeam_channel::{bounded, Receiver};

    fn setup(filters: Filters, buffer: usize) -> (Arc<EventLog>, DeliveryEngine, Receiver<Event>) {
        let log = Arc::new(EventLog::new(100));
        let (tx, rx) = bounded(buffer);
        let engine = DeliveryEngine::new(SubscriptionId(1), Arc::clone(&log), filters, tx);
        (log, engine, rx)
    }

    fn begin(log: &EventLog, repo: i64, job: i64) -> Event {
        log.append(EventKind::Begin, RepositoryId(repo), Some(JobId(job)), Payload::None)
    }

    fn drain(rx: &Receiver<Event>) -> Vec<u64> {
        rx.try_iter().map(|e| e.sequence.0).collect()
    }

    #[test]
    fn test_open_skips_backlog() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 10);
        begin(&log, 1, 1);
        begin(&log, 1, 2);

        assert_eq!(engine.state(), SubscriptionState::Init);
        assert!(engine.open());
        assert_eq!(engine.cursor(), Sequence(2));

        let stats = engine.tick();
        assert_eq!(stats, TickStats::default());
        assert!(drain(&rx).is_empty());

        begin(&log, 1, 3);
        engine.tick();
        assert_eq!(drain(&rx), vec![3]);
    }

    #[test]
    fn test_tick_before_open_does_nothing() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 10);
        begin(&log, 1, 1);
        assert_eq!(engine.tick().scanned, 0);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_cursor_advances_past_non_matching() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 10);
        engine.open();

        begin(&log, 2, 1);
        begin(&log, 1, 1);
        begin(&log, 2, 1);

        let stats = engine.tick();
        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.delivered, 1);
        assert_eq!(engine.cursor(), Sequence(3));
        assert_eq!(drain(&rx), vec![2]);

        // Nothing new: cursor unchanged.
        engine.tick();
        assert_eq!(engine.cursor(), Sequence(3));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_unlisted_kind_not_delivered() {
        let filters = Filters::new().with(EventKind::TestBegin, Filter::repository(RepositoryId(1)));
        let (log, mut engine, rx) = setup(filters, 10);
        engine.open();

        begin(&log, 1, 1);
        log.append(
            EventKind::TestBegin,
            RepositoryId(1),
            Some(JobId(1)),
            Payload::Test(TestIdentifier::new("a.spec.ts", ["s"], "t")),
        );

        engine.tick();
        assert_eq!(drain(&rx), vec![2]);
    }

    #[test]
    fn test_full_buffer_resumes_next_tick() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 2);
        engine.open();

        for job in 0..5 {
            begin(&log, 1, job);
        }

        let stats = engine.tick();
        assert_eq!(stats.delivered, 2);
        assert!(stats.deferred);
        assert_eq!(engine.cursor(), Sequence(2));
        assert_eq!(drain(&rx), vec![1, 2]);
        assert_eq!(engine.state(), SubscriptionState::Open);

        let stats = engine.tick();
        assert_eq!(stats.delivered, 2);
        assert_eq!(drain(&rx), vec![3, 4]);

        let stats = engine.tick();
        assert_eq!(stats.delivered, 1);
        assert!(!stats.deferred);
        assert_eq!(engine.cursor(), Sequence(5));
        assert_eq!(drain(&rx), vec![5]);
    }

    #[test]
    fn test_full_buffer_keeps_cursor_past_skipped_events() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 1);
        engine.open();

        begin(&log, 1, 1);
        begin(&log, 2, 1);
        begin(&log, 1, 2);

        engine.tick();
        // Non-matching event 2 was scanned before the buffer filled on 3.
        assert_eq!(engine.cursor(), Sequence(2));
        assert_eq!(drain(&rx), vec![1]);

        engine.tick();
        assert_eq!(drain(&rx), vec![3]);
    }

    #[test]
    fn test_disconnected_output_closes() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 10);
        engine.open();
        drop(rx);

        begin(&log, 1, 1);
        begin(&log, 1, 2);
        engine.tick();

        assert_eq!(engine.state(), SubscriptionState::Closed);
        assert_eq!(engine.cursor(), Sequence(1));
    }

    #[test]
    fn test_close_is_idempotent_and_stops_delivery() {
        let (log, mut engine, rx) = setup(Filters::repository_runs(RepositoryId(1)), 10);
        engine.open();

        assert!(engine.close());
        assert!(!engine.close());
        assert!(!engine.open());

        begin(&log, 1, 1);
        assert_eq!(engine.tick(), TickStats::default());

        // Output ends once the engine lets go of it.
        assert!(matches!(
            rx.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        ));
        // The engine no longer holds the log.
        assert_eq!(Arc::strong_count(&log), 1);
    }

    #[test]
    fn test_eviction_between_ticks_is_silent() {
        let log = Arc::new(EventLog::new(3));
        let (tx, rx) = bounded(100);
        let mut engine = DeliveryEngine::new(
            SubscriptionId(1),
            Arc::clone(&log),
            Filters::repository_runs(RepositoryId(1)),
            tx,
        );
        engine.open();

        for job in 0..6 {
            begin(&log, 1, job);
        }

        engine.tick();
        assert_eq!(drain(&rx), vec![4, 5, 6]);
        assert_eq!(engine.cursor(), Sequence(6));
    }
}
