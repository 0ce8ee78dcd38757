//! SNMP sample source
//!
//! Issues one SNMP v2c GET per configured OID and assembles the answers into a
//! single `Record`. The `snmp` crate is blocking, so every round runs on the
//! blocking pool.
//!
//! `SyncSession::get` takes a single OID, so a round costs one request per
//! binding: its latency and worst-case duration (`timeout` per request) grow
//! with the number of configured OIDs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ContractError, OidBinding, Record, RelaySettings, SampleSource, ScalarValue};
use snmp::{SyncSession, Value};
use tracing::{debug, instrument, warn};

use crate::error::{DeviceError, Result};

/// Connection parameters of one device
#[derive(Debug, Clone)]
pub struct SnmpTarget {
    /// Host name or IP address
    pub host: String,
    /// UDP port, normally 161
    pub port: u16,
    /// Community string
    pub community: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl SnmpTarget {
    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outcome of reading one OID
#[derive(Debug, Clone, PartialEq)]
enum FieldReading {
    Value(ScalarValue),
    Unavailable(String),
}

/// Sample source backed by an SNMP agent
pub struct SnmpSampleSource {
    name: String,
    target: SnmpTarget,
    bindings: Arc<Vec<OidBinding>>,
    session: Arc<Mutex<Option<SyncSession>>>,
}

impl SnmpSampleSource {
    /// Create a source; the UDP session opens lazily on the first poll
    pub fn new(target: SnmpTarget, bindings: Vec<OidBinding>) -> Self {
        Self {
            name: format!("snmp://{}", target.address()),
            target,
            bindings: Arc::new(bindings),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Build from the settings document
    pub fn from_settings(settings: &RelaySettings) -> std::result::Result<Self, ContractError> {
        let target = SnmpTarget {
            host: settings.ip.clone(),
            port: settings.port,
            community: settings.community.clone(),
            timeout: settings.request_timeout(),
        };
        Ok(Self::new(target, settings.oid_bindings()?))
    }

    fn open_session(target: &SnmpTarget) -> Result<SyncSession> {
        SyncSession::new(
            target.address(),
            target.community.as_bytes(),
            Some(target.timeout),
            0,
        )
        .map_err(|e| DeviceError::SessionSetup {
            address: target.address(),
            message: e.to_string(),
        })
    }

    /// One full round on the calling (blocking) thread
    fn poll_blocking(
        target: &SnmpTarget,
        bindings: &[OidBinding],
        slot: &Mutex<Option<SyncSession>>,
    ) -> Result<Record> {
        let mut guard = slot.lock().map_err(|_| DeviceError::Worker {
            message: "session lock poisoned".to_string(),
        })?;

        if guard.is_none() {
            *guard = Some(Self::open_session(target)?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(DeviceError::Worker {
                message: "session unavailable".to_string(),
            });
        };

        let mut fields = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match Self::read_field(session, binding)? {
                FieldReading::Value(value) => fields.push((binding.field.clone(), value)),
                FieldReading::Unavailable(reason) => {
                    warn!(oid = %binding.oid, field = %binding.field, reason = %reason, "varbind error");
                }
            }
        }
        Ok(fields.into_iter().collect())
    }

    fn read_field(session: &mut SyncSession, binding: &OidBinding) -> Result<FieldReading> {
        let response = session
            .get(binding.oid.arcs())
            .map_err(|e| DeviceError::Request {
                oid: binding.oid.to_string(),
                message: format!("{e:?}"),
            })?;

        if response.error_status != 0 {
            return Ok(FieldReading::Unavailable(format!(
                "error status {}",
                response.error_status
            )));
        }

        let reading = response
            .varbinds
            .map(|(_, value)| convert_value(&value))
            .next()
            .unwrap_or_else(|| FieldReading::Unavailable("empty response".to_string()));
        Ok(reading)
    }
}

fn convert_value(value: &Value<'_>) -> FieldReading {
    match value {
        Value::Boolean(b) => FieldReading::Value(ScalarValue::Bool(*b)),
        Value::Integer(n) => FieldReading::Value(ScalarValue::Integer(*n)),
        Value::OctetString(bytes) | Value::Opaque(bytes) => {
            FieldReading::Value(ScalarValue::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        Value::Counter32(n) | Value::Unsigned32(n) | Value::Timeticks(n) => {
            FieldReading::Value(ScalarValue::from(*n))
        }
        Value::Counter64(n) => FieldReading::Value(ScalarValue::Unsigned(*n)),
        Value::IpAddress(octets) => FieldReading::Value(ScalarValue::Text(format!(
            "{}.{}.{}.{}",
            octets[0], octets[1], octets[2], octets[3]
        ))),
        Value::NoSuchObject => FieldReading::Unavailable("noSuchObject".to_string()),
        Value::NoSuchInstance => FieldReading::Unavailable("noSuchInstance".to_string()),
        Value::EndOfMibView => FieldReading::Unavailable("endOfMibView".to_string()),
        Value::Null => FieldReading::Unavailable("null".to_string()),
        other => FieldReading::Value(ScalarValue::Text(format!("{other:?}"))),
    }
}

impl SampleSource for SnmpSampleSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "snmp_poll", skip(self), fields(source = %self.name))]
    async fn poll(&mut self) -> std::result::Result<Record, ContractError> {
        let target = self.target.clone();
        let bindings = Arc::clone(&self.bindings);
        let slot = Arc::clone(&self.session);

        let outcome = tokio::task::spawn_blocking(move || {
            Self::poll_blocking(&target, &bindings, &slot)
        })
        .await
        .map_err(|e| DeviceError::Worker {
            message: e.to_string(),
        })
        .and_then(|result| result);

        match outcome {
            Ok(record) => {
                debug!(fields = record.len(), "poll complete");
                Ok(record)
            }
            Err(e) => Err(ContractError::poll(&self.name, e.to_string())),
        }
    }
}
