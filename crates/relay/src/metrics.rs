//! Relay counters for status reporting

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between the relay task and its handles
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Current buffer depth
    buffer_depth: AtomicUsize,
    /// Records accepted into the buffer
    buffered: AtomicU64,
    /// Envelopes acknowledged by the transport
    envelopes_published: AtomicU64,
    /// Records inside acknowledged envelopes
    records_published: AtomicU64,
    /// Failed publish attempts
    publish_failures: AtomicU64,
    /// Records pushed back after a disconnect
    requeued: AtomicU64,
    /// Records lost to the buffer bound
    dropped: AtomicU64,
    /// Flush chains started
    flushes: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_buffer_depth(&self, depth: usize) {
        self.buffer_depth.store(depth, Ordering::Relaxed);
        observability::record_buffer_depth(depth);
    }

    pub(crate) fn inc_buffered(&self, depth: usize) {
        self.buffered.fetch_add(1, Ordering::Relaxed);
        self.buffer_depth.store(depth, Ordering::Relaxed);
        observability::record_sample_buffered(depth);
    }

    pub(crate) fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        observability::record_samples_dropped(1);
    }

    pub(crate) fn inc_flushes(&self, snapshot_len: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        observability::record_flush_started(snapshot_len);
    }

    pub(crate) fn add_published(&self, records: usize, latency_ms: f64) {
        self.envelopes_published.fetch_add(1, Ordering::Relaxed);
        self.records_published
            .fetch_add(records as u64, Ordering::Relaxed);
        observability::record_envelope_published(records, latency_ms);
    }

    pub(crate) fn inc_publish_failures(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
        observability::record_publish_failure();
    }

    pub(crate) fn add_requeued(&self, records: usize) {
        self.requeued.fetch_add(records as u64, Ordering::Relaxed);
        observability::record_records_requeued(records);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            buffer_depth: self.buffer_depth.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            envelopes_published: self.envelopes_published.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the relay counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayMetricsSnapshot {
    pub buffer_depth: usize,
    pub buffered: u64,
    pub envelopes_published: u64,
    pub records_published: u64,
    pub publish_failures: u64,
    pub requeued: u64,
    pub dropped: u64,
    pub flushes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_updates() {
        let metrics = RelayMetrics::new();
        metrics.inc_buffered(1);
        metrics.inc_buffered(2);
        metrics.inc_flushes(2);
        metrics.add_published(1, 3.0);
        metrics.inc_publish_failures();
        metrics.add_requeued(1);
        metrics.set_buffer_depth(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.buffered, 2);
        assert_eq!(snapshot.buffer_depth, 1);
        assert_eq!(snapshot.flushes, 1);
        assert_eq!(snapshot.envelopes_published, 1);
        assert_eq!(snapshot.records_published, 1);
        assert_eq!(snapshot.publish_failures, 1);
        assert_eq!(snapshot.requeued, 1);
        assert_eq!(snapshot.dropped, 0);
    }
}
