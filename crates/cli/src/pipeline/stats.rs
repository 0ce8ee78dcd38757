//! Relay run statistics.

use std::time::Duration;

use relay::RelayMetricsSnapshot;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Relay counters at shutdown
    pub metrics: RelayMetricsSnapshot,

    /// Records still held when the relay stopped
    pub undelivered: usize,
}

impl RelayStats {
    /// Published records per minute
    pub fn records_per_minute(&self) -> f64 {
        let minutes = self.duration.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.metrics.records_published as f64 / minutes
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let m = &self.metrics;

        println!("\n=== Relay Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Records buffered: {}", m.buffered);
        println!("   ├─ Records published: {}", m.records_published);
        println!("   ├─ Records/min: {:.2}", self.records_per_minute());
        println!("   └─ Undelivered at shutdown: {}", self.undelivered);

        println!("\nDelivery");
        println!("   ├─ Flush cycles: {}", m.flushes);
        println!("   ├─ Envelopes published: {}", m.envelopes_published);
        println!("   ├─ Publish failures: {}", m.publish_failures);
        println!("   ├─ Records requeued: {}", m.requeued);
        println!("   └─ Records dropped: {}", m.dropped);

        println!();
    }
}
