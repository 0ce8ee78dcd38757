//! Poll scheduler
//!
//! Polls the sample source every `interval`. After a successful poll the
//! record goes to the relay and polling pauses for the quiet period, then the
//! baseline timer restarts. Failed polls are skipped without touching the
//! timer.

use std::time::Duration;

use contracts::{RelaySettings, SampleSource};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::handle::RelayHandle;

/// Drives one sample source on the baseline/quiet schedule
pub struct PollScheduler<S> {
    source: S,
    relay: RelayHandle,
    interval: Duration,
    quiet_period: Duration,
}

impl<S> PollScheduler<S>
where
    S: SampleSource + 'static,
{
    pub fn new(source: S, relay: RelayHandle, interval: Duration, quiet_period: Duration) -> Self {
        Self {
            source,
            relay,
            // a zero period would make the interval panic
            interval: interval.max(Duration::from_millis(1)),
            quiet_period,
        }
    }

    /// Use `interval` and `submitEvery` from the settings document
    pub fn from_settings(source: S, relay: RelayHandle, settings: &RelaySettings) -> Self {
        Self::new(
            source,
            relay,
            settings.poll_interval(),
            settings.quiet_period(),
        )
    }

    fn baseline(&self) -> Interval {
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }

    /// Poll until the relay stops accepting records
    #[instrument(name = "poll_scheduler_run", skip(self), fields(source = %self.source.name()))]
    pub async fn run(mut self) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            quiet_secs = self.quiet_period.as_secs_f64(),
            "Poll scheduler started"
        );

        let mut timer = self.baseline();
        loop {
            timer.tick().await;

            match self.source.poll().await {
                Ok(record) => {
                    observability::record_poll(self.source.name(), true);
                    debug!(fields = record.len(), "Sample collected");

                    if self.relay.push(record).is_err() {
                        info!("Relay stopped, poll scheduler exiting");
                        return;
                    }

                    if !self.quiet_period.is_zero() {
                        debug!(
                            quiet_secs = self.quiet_period.as_secs_f64(),
                            "Polling paused"
                        );
                        tokio::time::sleep(self.quiet_period).await;
                    }
                    timer = self.baseline();
                }
                Err(e) => {
                    observability::record_poll(self.source.name(), false);
                    debug!(error = %e, "Poll failed, round skipped");
                }
            }
        }
    }

    /// Run as a background task; abort the handle to stop polling
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
