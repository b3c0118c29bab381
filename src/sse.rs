//! Server-Sent Events framing for subscription output.
//!
//! One event per frame: the sequence as `id`, the kind as `event`, and the
//! JSON-encoded event as `data`.

use crate::error::Result;
use crate::subscriptions::Subscription;
use crate::types::Event;
use crossbeam_channel::RecvTimeoutError;
use std::time::Duration;

/// Comment frame sent while idle so proxies keep the connection open.
pub const KEEP_ALIVE: &str = ": keep-alive\n\n";

/// Encode one event as an SSE frame.
pub fn encode_event(event: &Event) -> Result<String> {
    let data = serde_json::to_string(event)?;
    Ok(format!(
        "id: {}\nevent: {}\ndata: {}\n\n",
        event.sequence, event.kind, data
    ))
}

pub fn keep_alive() -> &'static str {
    KEEP_ALIVE
}

/// Adapts a subscription into a blocking iterator of SSE frames.
///
/// Ends when the subscription is closed and drained. Dropping it closes
/// the subscription.
pub struct SseFrames {
    subscription: Subscription,
    keep_alive: Option<Duration>,
}

impl SseFrames {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            keep_alive: None,
        }
    }

    /// Emit a keep-alive comment after `interval` without events.
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn into_inner(self) -> Subscription {
        self.subscription
    }
}

impl Iterator for SseFrames {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.keep_alive {
            None => self.subscription.next().map(|event| encode_event(&event)),
            Some(interval) => match self.subscription.recv_timeout(interval) {
                Ok(event) => Some(encode_event(&event)),
                Err(RecvTimeoutError::Timeout) => Some(Ok(KEEP_ALIVE.to_string())),
                Err(RecvTimeoutError::Disconnected) => None,
            },
        }
    }
}
