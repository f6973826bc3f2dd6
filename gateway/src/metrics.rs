//! Connection-level metrics for the WebSocket fan-out.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct WsMetrics {
    connected: AtomicU64,
    disconnected: AtomicU64,
    lagged_events: AtomicU64,
    queue_full_drops: AtomicU64,
    send_errors: AtomicU64,
    send_timeouts: AtomicU64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct WsMetricsSnapshot {
    pub connected: u64,
    pub disconnected: u64,
    pub lagged_events: u64,
    pub queue_full_drops: u64,
    pub send_errors: u64,
    pub send_timeouts: u64,
}

impl WsMetrics {
    pub fn inc_connected(&self) {
        self.connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_disconnected(&self) {
        self.disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_lagged(&self, skipped: u64) {
        self.lagged_events.fetch_add(skipped, Ordering::Relaxed);
    }

    pub fn inc_queue_full(&self) {
        self.queue_full_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_send_timeout(&self) {
        self.send_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WsMetricsSnapshot {
        WsMetricsSnapshot {
            connected: self.connected.load(Ordering::Relaxed),
            disconnected: self.disconnected.load(Ordering::Relaxed),
            lagged_events: self.lagged_events.load(Ordering::Relaxed),
            queue_full_drops: self.queue_full_drops.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            send_timeouts: self.send_timeouts.load(Ordering::Relaxed),
        }
    }
}
