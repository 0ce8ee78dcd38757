//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DropPolicy, RelaySettings};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Settings info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    broker: BrokerInfo,
    device: DeviceInfo,
    schedule: ScheduleInfo,
    oids: Vec<OidInfo>,
    delivery: DeliveryInfo,
}

#[derive(Serialize)]
struct BrokerInfo {
    url: String,
    topic: String,
    username: String,
    client_id: String,
    clean_session: bool,
    keep_alive_secs: u64,
    reconnect_period_ms: u64,
}

#[derive(Serialize)]
struct DeviceInfo {
    ip: String,
    port: u16,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ScheduleInfo {
    interval_ms: u64,
    submit_every_min: f64,
}

#[derive(Serialize)]
struct OidInfo {
    oid: String,
    field: String,
}

#[derive(Serialize)]
struct DeliveryInfo {
    flush_interval_ms: u64,
    pacing_ms: u64,
    max_chunk: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer_capacity: Option<usize>,
    overflow_policy: DropPolicy,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let settings = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&settings);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&settings);
    }

    Ok(())
}

fn build_config_info(settings: &RelaySettings) -> ConfigInfo {
    let mqtt = &settings.mqtt;
    let delivery = &settings.delivery;

    ConfigInfo {
        broker: BrokerInfo {
            url: mqtt.url.clone(),
            topic: mqtt.topic.clone(),
            username: mqtt.username.clone(),
            client_id: mqtt.client_id.clone(),
            clean_session: mqtt.clean_session,
            keep_alive_secs: mqtt.keep_alive_secs,
            reconnect_period_ms: mqtt.reconnect_period_ms,
        },
        device: DeviceInfo {
            ip: settings.ip.clone(),
            port: settings.port,
            timeout_ms: settings.timeout_ms,
        },
        schedule: ScheduleInfo {
            interval_ms: settings.interval,
            submit_every_min: settings.submit_every,
        },
        oids: settings
            .oids
            .iter()
            .map(|(oid, field)| OidInfo {
                oid: oid.clone(),
                field: field.clone(),
            })
            .collect(),
        delivery: DeliveryInfo {
            flush_interval_ms: delivery.flush_interval_ms,
            pacing_ms: delivery.pacing_ms,
            max_chunk: delivery.max_chunk,
            buffer_capacity: delivery.buffer_capacity,
            overflow_policy: delivery.overflow_policy,
        },
    }
}

fn print_config_info(settings: &RelaySettings) {
    let mqtt = &settings.mqtt;
    let delivery = &settings.delivery;

    println!("=== SNMP Relay Configuration ===\n");

    println!("Broker");
    println!("   ├─ URL: {}", mqtt.url);
    println!("   ├─ Topic: {}", mqtt.topic);
    println!("   ├─ Username: {}", mqtt.username);
    println!("   ├─ Client ID: {}", mqtt.client_id);
    println!("   ├─ Clean session: {}", mqtt.clean_session);
    println!("   └─ Keep alive: {}s", mqtt.keep_alive_secs);

    println!("\nDevice");
    println!("   ├─ Address: {}:{}", settings.ip, settings.port);
    println!("   ├─ Timeout: {} ms", settings.timeout_ms);
    println!("   ├─ Poll interval: {} ms", settings.interval);
    println!("   └─ Quiet period: {} min", settings.submit_every);

    println!("\nOIDs ({})", settings.oids.len());
    for (i, (oid, field)) in settings.oids.iter().enumerate() {
        let prefix = if i == settings.oids.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {} -> {}", prefix, oid, field);
    }

    println!("\nDelivery");
    println!("   ├─ Flush interval: {} ms", delivery.flush_interval_ms);
    println!("   ├─ Pacing: {} ms", delivery.pacing_ms);
    println!("   ├─ Records per envelope: {}", delivery.max_chunk);
    match delivery.buffer_capacity {
        Some(capacity) => println!(
            "   └─ Buffer: {} records ({:?})",
            capacity, delivery.overflow_policy
        ),
        None => println!("   └─ Buffer: unbounded"),
    }

    println!();
}
