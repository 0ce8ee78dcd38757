//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use config_loader::DEFAULT_SETTINGS_FILE;
use std::path::PathBuf;

/// SNMP relay - polls an SNMP device and publishes its values to MQTT
#[derive(Parser, Debug)]
#[command(
    name = "snmp-relay",
    author,
    version,
    about = "Relay SNMP device readings to an MQTT broker",
    long_about = "Polls a device over SNMP for a fixed set of OIDs and relays each reading,\n\
                  buffered and paced, to an MQTT topic. Readings taken while the broker\n\
                  is unreachable are kept and delivered in order after reconnecting."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SNMP_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "plain",
        global = true,
        env = "SNMP_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the device and relay readings until interrupted
    Run(RunArgs),

    /// Validate the settings document without running
    Validate(ValidateArgs),

    /// Display the effective settings
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the settings document (JSON or TOML)
    #[arg(
        short,
        long,
        default_value = DEFAULT_SETTINGS_FILE,
        env = "SNMP_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "SNMP_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate the settings and exit without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the settings document to validate
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE, env = "SNMP_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the settings document
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE, env = "SNMP_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// `[<epoch-ms>]\t<LEVEL>: <message>` lines
    #[default]
    Plain,
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Plain => Self::Plain,
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
