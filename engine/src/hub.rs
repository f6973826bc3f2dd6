//! Fan-out of engine events to subscribers.
//!
//! Publishing never blocks: a slow subscriber lags (and later observes
//! `RecvError::Lagged`) rather than delaying the clock. Delivery is
//! at-most-once per subscriber per event.

use aviator_types::Event;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

pub struct BroadcastHub {
    sender: broadcast::Sender<Event>,
    published: AtomicU64,
    unobserved: AtomicU64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct HubSnapshot {
    pub subscribers: usize,
    pub published: u64,
    pub unobserved: u64,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            unobserved: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: Event) {
        self.published.fetch_add(1, Ordering::Relaxed);
        // Send only fails when nobody is subscribed, which is fine: ticks
        // are display-only and a new subscriber resynchronizes on connect.
        if self.sender.send(event).is_err() {
            self.unobserved.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            subscribers: self.subscriber_count(),
            published: self.published.load(Ordering::Relaxed),
            unobserved: self.unobserved.load(Ordering::Relaxed),
        }
    }
}
