use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the reconciliation engine.
///
/// Cheap to clone; all clones share the same counters.
#[derive(Clone, Default)]
pub struct ReconcileMetrics {
    events_received: Arc<AtomicU64>,
    events_applied: Arc<AtomicU64>,
    events_malformed: Arc<AtomicU64>,
    events_dropped_unknown: Arc<AtomicU64>,
    events_discarded: Arc<AtomicU64>,
    snapshots_applied: Arc<AtomicU64>,
    snapshots_failed: Arc<AtomicU64>,
    notifications_emitted: Arc<AtomicU64>,
}

impl ReconcileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push message taken off the channel (before decoding)
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Push event merged into the store
    pub fn record_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.events_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Push event naming an entity the store does not hold
    pub fn record_dropped_unknown(&self) {
        self.events_dropped_unknown.fetch_add(1, Ordering::Relaxed);
    }

    /// Push event decoded after the activation closed
    pub fn record_discarded(&self) {
        self.events_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_applied(&self) {
        self.snapshots_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_failed(&self) {
        self.snapshots_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            events_malformed: self.events_malformed.load(Ordering::Relaxed),
            events_dropped_unknown: self.events_dropped_unknown.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            snapshots_applied: self.snapshots_applied.load(Ordering::Relaxed),
            snapshots_failed: self.snapshots_failed.load(Ordering::Relaxed),
            notifications_emitted: self.notifications_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_applied: u64,
    pub events_malformed: u64,
    pub events_dropped_unknown: u64,
    pub events_discarded: u64,
    pub snapshots_applied: u64,
    pub snapshots_failed: u64,
    pub notifications_emitted: u64,
}
