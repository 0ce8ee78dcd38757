//! Relay metric recording
//!
//! Thin wrappers over the `metrics` facade so call sites stay one line and
//! metric names live in one place. Without an installed recorder every call
//! is a no-op.

use contracts::TransportEvent;
use metrics::{counter, gauge, histogram};

/// Record the outcome of one polling round
pub fn record_poll(source: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "snmp_relay_polls_total",
        "source" => source.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a record entering the sample buffer
pub fn record_sample_buffered(depth: usize) {
    counter!("snmp_relay_samples_buffered_total").increment(1);
    gauge!("snmp_relay_buffer_depth").set(depth as f64);
}

/// Record current buffer depth
pub fn record_buffer_depth(depth: usize) {
    gauge!("snmp_relay_buffer_depth").set(depth as f64);
}

/// Record records evicted or rejected by a bounded buffer
pub fn record_samples_dropped(count: usize) {
    counter!("snmp_relay_samples_dropped_total").increment(count as u64);
}

/// Record a flush cycle taking a non-empty snapshot
pub fn record_flush_started(snapshot_len: usize) {
    counter!("snmp_relay_flushes_total").increment(1);
    histogram!("snmp_relay_flush_snapshot_size").record(snapshot_len as f64);
}

/// Record an acknowledged envelope
pub fn record_envelope_published(records: usize, latency_ms: f64) {
    counter!("snmp_relay_envelopes_published_total").increment(1);
    counter!("snmp_relay_records_published_total").increment(records as u64);
    histogram!("snmp_relay_publish_latency_ms").record(latency_ms);
}

/// Record a failed publish attempt
pub fn record_publish_failure() {
    counter!("snmp_relay_publish_failures_total").increment(1);
}

/// Record records pushed back to the buffer after a disconnect
pub fn record_records_requeued(count: usize) {
    counter!("snmp_relay_records_requeued_total").increment(count as u64);
}

/// Record a transport lifecycle event and the resulting state
pub fn record_transport_event(event: TransportEvent) {
    counter!(
        "snmp_relay_transport_events_total",
        "event" => event.to_string()
    )
    .increment(1);
    let connected = if event.resulting_state().is_connected() {
        1.0
    } else {
        0.0
    };
    gauge!("snmp_relay_transport_connected").set(connected);
}
