//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RelaySettings;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    broker: String,
    topic: String,
    device: String,
    oid_count: usize,
    interval_ms: u64,
    submit_every_min: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    broker: settings.mqtt.url.clone(),
                    topic: settings.mqtt.topic.clone(),
                    device: format!("{}:{}", settings.ip, settings.port),
                    oid_count: settings.oids.len(),
                    interval_ms: settings.interval,
                    submit_every_min: settings.submit_every,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(settings: &RelaySettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if settings.mqtt.password.is_none() {
        warnings.push("mqtt.password is not set - connecting with an empty password".to_string());
    }

    if settings.delivery.buffer_capacity.is_none() {
        warnings.push(
            "delivery.bufferCapacity is not set - the buffer grows without limit while the broker is unreachable"
                .to_string(),
        );
    }

    if settings.submit_every == 0.0 {
        warnings.push("submitEvery is 0 - the device is polled every interval".to_string());
    }

    let quiet_ms = settings.quiet_period().as_millis();
    if quiet_ms > 0 && quiet_ms < u128::from(settings.interval) {
        warnings.push(format!(
            "submitEvery ({} ms) is shorter than interval ({} ms)",
            quiet_ms, settings.interval
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Broker: {}", summary.broker);
            println!("  Topic: {}", summary.topic);
            println!("  Device: {}", summary.device);
            println!("  OIDs: {}", summary.oid_count);
            println!("  Interval: {} ms", summary.interval_ms);
            println!("  Quiet period: {} min", summary.submit_every_min);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
