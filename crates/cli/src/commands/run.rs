//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::RelaySettings;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let settings = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        broker = %settings.mqtt.url,
        topic = %settings.mqtt.topic,
        device = %format!("{}:{}", settings.ip, settings.port),
        oids = settings.oids.len(),
        interval_ms = settings.interval,
        submit_every_min = settings.submit_every,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_settings_summary(&settings);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        settings,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    info!("Starting relay...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Relay failed")?;
    stats.print_summary();

    info!("SNMP relay finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping relay...");
}

/// Print settings summary for dry-run mode
fn print_settings_summary(settings: &RelaySettings) {
    println!("\n=== Configuration Summary ===\n");
    println!("Broker:");
    println!("  URL: {}", settings.mqtt.url);
    println!("  Topic: {}", settings.mqtt.topic);
    println!("  Client ID: {}", settings.mqtt.client_id);
    println!("\nDevice:");
    println!("  Address: {}:{}", settings.ip, settings.port);
    println!("  Poll interval: {} ms", settings.interval);
    println!("  Quiet period: {} min", settings.submit_every);
    println!("\nOIDs ({}):", settings.oids.len());
    for (oid, field) in &settings.oids {
        println!("  - {oid} -> {field}");
    }
    println!();
}
