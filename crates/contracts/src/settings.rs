//! RelaySettings - Config Loader output
//!
//! The static settings document: broker endpoint, device address, OID to field
//! mapping, polling cadence and delivery tuning. Keys keep their camelCase
//! document names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::ContractError;

/// Complete settings document
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RelaySettings {
    /// Publish transport settings
    #[validate(nested)]
    pub mqtt: MqttSettings,

    /// Baseline poll period in milliseconds
    #[validate(range(min = 1))]
    pub interval: u64,

    /// Quiet period after a successful poll, in minutes
    #[validate(range(min = 0.0))]
    pub submit_every: f64,

    /// SNMP community string
    #[validate(length(min = 1))]
    pub community: String,

    /// Device address (host name or IP)
    #[validate(length(min = 1))]
    pub ip: String,

    /// SNMP agent port
    #[serde(default = "default_snmp_port")]
    pub port: u16,

    /// Per-request SNMP timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Object identifier -> output field name
    pub oids: BTreeMap<String, String>,

    /// Delivery tuning
    #[serde(default)]
    #[validate(nested)]
    pub delivery: DeliverySettings,
}

fn default_snmp_port() -> u16 {
    161
}

fn default_timeout_ms() -> u64 {
    5000
}

impl RelaySettings {
    /// Baseline poll period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    /// Quiet period after a successful poll
    ///
    /// Saturates at `Duration::MAX` for values too large to represent.
    pub fn quiet_period(&self) -> Duration {
        let secs = self.submit_every * 60.0;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// SNMP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed OID bindings, in OID order
    pub fn oid_bindings(&self) -> Result<Vec<OidBinding>, ContractError> {
        self.oids
            .iter()
            .map(|(oid, field)| {
                Ok(OidBinding {
                    oid: oid.parse()?,
                    field: field.clone(),
                })
            })
            .collect()
    }
}

/// Publish transport (MQTT) settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MqttSettings {
    /// Broker URL, `mqtt://host[:port]` or `tcp://host[:port]`
    #[validate(length(min = 1))]
    pub url: String,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Publish destination
    #[validate(length(min = 1))]
    pub topic: String,

    #[serde(default = "default_client_id")]
    #[validate(length(min = 1))]
    pub client_id: String,

    #[serde(default)]
    pub clean_session: bool,

    #[serde(default = "default_keep_alive_secs")]
    #[validate(range(min = 5))]
    pub keep_alive_secs: u64,

    /// Delay between a lost connection and the next attempt
    #[serde(default = "default_reconnect_period_ms")]
    pub reconnect_period_ms: u64,
}

fn default_client_id() -> String {
    "snmpClient".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_reconnect_period_ms() -> u64 {
    1000
}

impl MqttSettings {
    /// Parsed broker address
    pub fn broker(&self) -> Result<BrokerAddress, ContractError> {
        self.url.parse()
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_period(&self) -> Duration {
        Duration::from_millis(self.reconnect_period_ms)
    }
}

/// Delivery (dispatcher + chunk/pace/retry) tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySettings {
    /// Dispatcher period in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    #[validate(range(min = 1))]
    pub flush_interval_ms: u64,

    /// Delay after each successful publish, in milliseconds
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Maximum records per envelope
    #[serde(default = "default_max_chunk")]
    #[validate(range(min = 1))]
    pub max_chunk: usize,

    /// Optional bound on the sample buffer (None = unbounded)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub buffer_capacity: Option<usize>,

    /// What to drop when the bound is hit
    #[serde(default)]
    pub overflow_policy: DropPolicy,
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_pacing_ms() -> u64 {
    200
}

fn default_max_chunk() -> usize {
    1
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            pacing_ms: default_pacing_ms(),
            max_chunk: default_max_chunk(),
            buffer_capacity: None,
            overflow_policy: DropPolicy::default(),
        }
    }
}

impl DeliverySettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Overflow policy of a bounded buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropPolicy {
    /// Evict the oldest pending record
    #[default]
    DropOldest,
    /// Reject the incoming record
    DropNewest,
}

/// Parsed broker endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub const DEFAULT_PORT: u16 = 1883;
}

impl FromStr for BrokerAddress {
    type Err = ContractError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let rest = url
            .strip_prefix("mqtt://")
            .or_else(|| url.strip_prefix("tcp://"))
            .ok_or_else(|| {
                ContractError::config_validation(
                    "mqtt.url",
                    format!("unsupported scheme in '{url}', expected mqtt:// or tcp://"),
                )
            })?;

        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    ContractError::config_validation(
                        "mqtt.url",
                        format!("invalid port '{port}': {e}"),
                    )
                })?;
                (host, port)
            }
            None => (authority, Self::DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(ContractError::config_validation(
                "mqtt.url",
                format!("missing host in '{url}'"),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Numeric object identifier, e.g. `1.3.6.1.2.1.1.3.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Vec<u32>);

impl ObjectId {
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        let arcs = trimmed
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                ContractError::config_validation(format!("oids[{s}]"), format!("invalid OID: {e}"))
            })?;

        if arcs.len() < 2 {
            return Err(ContractError::config_validation(
                format!("oids[{s}]"),
                "OID needs at least two arcs",
            ));
        }
        Ok(Self(arcs))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

/// One OID and the output field it populates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidBinding {
    pub oid: ObjectId,
    pub field: String,
}
