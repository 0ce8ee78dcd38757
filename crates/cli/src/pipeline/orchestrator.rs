//! Pipeline orchestrator - wires transport, relay and poll scheduler.
//!
//! Supports both a real SNMP device and a mock source via feature flags.
//! When `real-snmp` feature is disabled, runs in mock mode.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::RelaySettings;
use relay::{PollScheduler, RelayConfig, RelayHandle, RelayService};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::RelayStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The loaded settings document
    pub settings: RelaySettings,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, then stop every component
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RelayStats> {
        let start_time = Instant::now();
        let settings = &self.config.settings;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Handle first: the transport reports its events through it
        let (relay, inbox) = relay::channel();

        let (publisher, connection) = transport::connect(&settings.mqtt, relay.event_callback())
            .with_context(|| format!("Failed to set up MQTT client for {}", settings.mqtt.url))?;

        let service = RelayService::new(publisher, RelayConfig::from_settings(settings), inbox)
            .context("Failed to create relay")?;
        let relay_task = tokio::spawn(service.run());

        let scheduler_task = spawn_scheduler(settings, relay.clone())?;

        info!(
            topic = %settings.mqtt.topic,
            interval_ms = settings.interval,
            "Relay running"
        );

        shutdown.await;

        info!("Shutting down relay...");
        scheduler_task.abort();

        let undelivered = relay
            .shutdown()
            .await
            .context("Relay stopped unexpectedly")?;
        if let Err(e) = relay_task.await {
            warn!(error = %e, "Relay task ended abnormally");
        }
        connection.close().await;

        if undelivered > 0 {
            warn!(undelivered, "Buffered records were not delivered before shutdown");
        }

        let stats = RelayStats {
            duration: start_time.elapsed(),
            metrics: relay.metrics(),
            undelivered,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            published = stats.metrics.records_published,
            "Relay shutdown complete"
        );

        Ok(stats)
    }
}

/// Start polling the configured SNMP device
#[cfg(feature = "real-snmp")]
fn spawn_scheduler(settings: &RelaySettings, relay: RelayHandle) -> Result<JoinHandle<()>> {
    let source = device::SnmpSampleSource::from_settings(settings)
        .context("Failed to set up SNMP source")?;

    info!(
        device = %format!("{}:{}", settings.ip, settings.port),
        oids = settings.oids.len(),
        "Polling SNMP device"
    );

    Ok(PollScheduler::from_settings(source, relay, settings).spawn())
}

/// Start polling a synthetic source producing the configured fields
#[cfg(not(feature = "real-snmp"))]
fn spawn_scheduler(settings: &RelaySettings, relay: RelayHandle) -> Result<JoinHandle<()>> {
    info!("Running in MOCK mode (no SNMP device polled)");

    let source = device::MockSampleSource::synthetic("mock", settings.oids.values().cloned());
    Ok(PollScheduler::from_settings(source, relay, settings).spawn())
}
