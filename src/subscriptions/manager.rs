//! Subscription manager: one timer-driven delivery engine per subscriber.

use crate::error::{RelayError, Result};
use crate::filter::Filters;
use crate::log::EventLog;
use crate::types::{Event, Sequence};
use crossbeam_channel::{bounded, select, tick, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use super::engine::DeliveryEngine;
use super::types::{SubscriptionConfig, SubscriptionId, SubscriptionState};

type Registry = RwLock<HashMap<SubscriptionId, Arc<Shared>>>;

/// State shared between a subscription handle and its worker thread.
struct Shared {
    engine: Mutex<DeliveryEngine>,
    closed: AtomicBool,
    /// Dropping the sender wakes the worker so it exits.
    stop: Mutex<Option<Sender<()>>>,
}

impl Shared {
    /// Run one tick. Returns false once the worker should exit.
    fn tick(&self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut engine = self.engine.lock();
        engine.tick();
        engine.state() != SubscriptionState::Closed
    }

    /// Close the engine. Once this returns, nothing more is delivered.
    fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        self.stop.lock().take();
        // Waits for an in-flight tick to finish.
        self.engine.lock().close();
        first
    }
}

fn run_worker(shared: Arc<Shared>, stop: Receiver<()>, poll_interval: Duration) {
    let ticker = tick(poll_interval);
    loop {
        select! {
            recv(ticker) -> _ => {
                if !shared.tick() {
                    break;
                }
            }
            recv(stop) -> _ => break,
        }
    }
    // The engine may have closed itself on a disconnected output.
    shared.close();
}

/// Creates and tears down subscriptions over one event log.
pub struct SubscriptionManager {
    log: Arc<EventLog>,
    config: SubscriptionConfig,
    /// Open subscriptions by ID.
    subscriptions: Arc<Registry>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new(log: Arc<EventLog>, config: SubscriptionConfig) -> Self {
        Self {
            log,
            config,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a subscription that receives future events accepted by `filters`.
    ///
    /// Events already in the log are never delivered to it. The cut-off is
    /// the log tail read when the engine opens, just before this returns;
    /// an event published concurrently after that point is delivered. The
    /// only failure is the OS refusing to start the worker thread.
    pub fn subscribe(&self, filters: Filters) -> Result<Subscription> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.config.buffer_size);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        info!(
            subscription = id.0,
            kinds = ?filters.kinds().collect::<Vec<_>>(),
            "Subscribing"
        );

        let shared = Arc::new(Shared {
            engine: Mutex::new(DeliveryEngine::new(id, Arc::clone(&self.log), filters, sender)),
            closed: AtomicBool::new(false),
            stop: Mutex::new(Some(stop_tx)),
        });

        let worker_shared = Arc::clone(&shared);
        let poll_interval = self.config.poll_interval;
        let worker = thread::Builder::new()
            .name(format!("relay-subscription-{}", id.0))
            .spawn(move || run_worker(worker_shared, stop_rx, poll_interval))?;

        self.subscriptions.write().insert(id, Arc::clone(&shared));

        // Position the cursor as late as possible so the backlog is skipped.
        shared.engine.lock().open();
        debug!(
            subscription = id.0,
            cursor = shared.engine.lock().cursor().0,
            "Subscription open"
        );

        Ok(Subscription {
            id,
            shared,
            receiver,
            worker: Some(worker),
            registry: Arc::clone(&self.subscriptions),
        })
    }

    /// Number of open subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Close every open subscription.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.subscriptions.write().drain().collect();
        for (_, shared) in &drained {
            shared.close();
        }
        info!(closed = drained.len(), "Closed all subscriptions");
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Output stream of one subscription.
///
/// Dropping it closes the subscription, so a disconnecting client cannot
/// leak its timer.
pub struct Subscription {
    id: SubscriptionId,
    shared: Arc<Shared>,
    receiver: Receiver<Event>,
    worker: Option<JoinHandle<()>>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn state(&self) -> SubscriptionState {
        self.shared.engine.lock().state()
    }

    /// Highest sequence this subscription has delivered or skipped.
    pub fn cursor(&self) -> Sequence {
        self.shared.engine.lock().cursor()
    }

    /// Receive the next event (blocking).
    ///
    /// Fails once the subscription is closed and its buffer is drained.
    pub fn recv(&self) -> Result<Event> {
        self.receiver
            .recv()
            .map_err(|_| RelayError::SubscriptionClosed)
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<Event, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Stop delivery and release the worker. Idempotent.
    ///
    /// Events buffered before the call can still be received.
    pub fn close(&mut self) {
        if self.shared.close() {
            info!(subscription = self.id.0, "Subscription closed");
        }
        self.registry.write().remove(&self.id);

        if let Some(worker) = self.worker.take() {
            // The worker only panics if the engine does; nothing to recover.
            let _ = worker.join();
        }
    }
}

impl Iterator for Subscription {
    type Item = Event;

    /// Blocks until the next event; ends once closed and drained.
    fn next(&mut self) -> Option<Event> {
        self.receiver.recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
