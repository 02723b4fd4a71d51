use std::sync::atomic::{AtomicU64, Ordering};

/// The four atomic counters the Tracker maintains. Every field is
/// lock-free and safe to read concurrently with submission and flushing.
#[derive(Debug, Default)]
pub struct TrackerStats {
    events_buffered: AtomicU64,
    events_flushed: AtomicU64,
    errors: AtomicU64,
    buffer_overflows: AtomicU64,
}

/// Point-in-time snapshot returned by [`TrackerStats::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerStatsSnapshot {
    pub events_buffered: u64,
    pub events_flushed: u64,
    pub errors: u64,
    pub buffer_overflows: u64,
}

impl TrackerStats {
    pub(crate) fn record_buffered(&self) {
        self.events_buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flushed(&self, count: u64) {
        self.events_flushed.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_errors(&self, count: u64) {
        self.errors.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.buffer_overflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a consistent-enough snapshot of all four counters. Safe to
    /// call concurrently with submission and flushing; the four fields
    /// may not reflect a single atomic instant, which the `getStats`
    /// contract does not require.
    #[must_use]
    pub fn snapshot(&self) -> TrackerStatsSnapshot {
        TrackerStatsSnapshot {
            events_buffered: self.events_buffered.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows.load(Ordering::Relaxed),
        }
    }
}

impl TrackerStatsSnapshot {
    /// Prometheus text-exposition rendering, so the counters can be
    /// scraped without coupling the tracker to a specific metrics
    /// backend.
    #[must_use]
    pub fn to_prometheus_text(self) -> String {
        format!(
            "# TYPE credential_tracker_events_buffered_total counter\n\
             credential_tracker_events_buffered_total {}\n\
             # TYPE credential_tracker_events_flushed_total counter\n\
             credential_tracker_events_flushed_total {}\n\
             # TYPE credential_tracker_errors_total counter\n\
             credential_tracker_errors_total {}\n\
             # TYPE credential_tracker_buffer_overflows_total counter\n\
             credential_tracker_buffer_overflows_total {}\n",
            self.events_buffered, self.events_flushed, self.errors, self.buffer_overflows,
        )
    }
}
