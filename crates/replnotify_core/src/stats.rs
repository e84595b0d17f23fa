//! Notifier counters.
//!
//! All counters are atomic and monotonically increasing; they can be read
//! while events are being dispatched.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a notifier.
#[derive(Debug, Default)]
pub struct NotifierStats {
    status_events: AtomicU64,
    document_events: AtomicU64,
    delivered: AtomicU64,
    dropped_unknown: AtomicU64,
    dropped_inactive: AtomicU64,
    observer_panics: AtomicU64,
}

impl NotifierStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_status_event(&self) {
        self.status_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_document_event(&self) {
        self.document_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_unknown(&self) {
        self.dropped_unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_inactive(&self) {
        self.dropped_inactive.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_observer_panic(&self) {
        self.observer_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> NotifierStatsSnapshot {
        NotifierStatsSnapshot {
            status_events: self.status_events.load(Ordering::Relaxed),
            document_events: self.document_events.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_unknown: self.dropped_unknown.load(Ordering::Relaxed),
            dropped_inactive: self.dropped_inactive.load(Ordering::Relaxed),
            observer_panics: self.observer_panics.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`NotifierStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifierStatsSnapshot {
    /// Status events raised by the core.
    pub status_events: u64,
    /// Document-ended events raised by the core.
    pub document_events: u64,
    /// Events handed to an observer (including ones whose handler panicked).
    pub delivered: u64,
    /// Events dropped because no observer was registered for the handle.
    pub dropped_unknown: u64,
    /// Queued events dropped because their registration was torn down.
    pub dropped_inactive: u64,
    /// Observer handlers that panicked.
    pub observer_panics: u64,
}

impl NotifierStatsSnapshot {
    /// Total events raised by the core.
    pub fn total_events(&self) -> u64 {
        self.status_events + self.document_events
    }

    /// Total events that never reached an observer.
    pub fn total_dropped(&self) -> u64 {
        self.dropped_unknown + self.dropped_inactive
    }
}
