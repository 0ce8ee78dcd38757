//! Transport state tracker
//!
//! Follows the publish transport's lifecycle events and owns the dispatcher
//! timer: the timer runs only while connected.

use std::time::Duration;

use contracts::{TransportEvent, TransportState};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Connection state plus the dispatcher timer
#[derive(Debug)]
pub struct TransportTracker {
    state: TransportState,
    flush_interval: Duration,
    timer: Option<Interval>,
}

impl TransportTracker {
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            state: TransportState::Disconnected,
            flush_interval,
            timer: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Apply one lifecycle event
    pub fn apply(&mut self, event: TransportEvent) {
        self.state = event.resulting_state();
        observability::record_transport_event(event);

        match event {
            TransportEvent::Connect => {
                info!("Connected to MQTT");
                self.start_timer();
            }
            TransportEvent::Offline => {
                info!("MQTT client went offline");
                self.stop_timer();
            }
            TransportEvent::Reconnect | TransportEvent::Close => {
                debug!(event = %event, "transport not connected");
                self.stop_timer();
            }
        }
    }

    /// Start the dispatcher timer; no-op when already running
    pub fn start_timer(&mut self) {
        if self.timer.is_some() {
            return;
        }
        info!(
            period_ms = self.flush_interval.as_millis() as u64,
            "Starting interval for buffer handling"
        );
        let mut timer = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
    }

    /// Stop the dispatcher timer; no-op when not running
    pub fn stop_timer(&mut self) {
        if self.timer.take().is_some() {
            debug!("Dispatcher timer stopped");
        }
    }

    /// Wait for the next dispatcher tick
    ///
    /// Never resolves while the timer is stopped. Cancel safe.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
