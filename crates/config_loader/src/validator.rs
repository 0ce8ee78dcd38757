//! Settings validation
//!
//! Rules:
//! - structural bounds declared on the settings types (`validator` derive)
//! - mqtt.url uses a supported scheme and names a host
//! - at least one OID, every OID numeric, every field name non-empty and unique
//! - bounded buffer capacity must be able to hold one full chunk

use std::collections::HashSet;

use contracts::{ContractError, RelaySettings};
use validator::Validate;

/// Validate RelaySettings
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(settings: &RelaySettings) -> Result<(), ContractError> {
    validate_bounds(settings)?;
    validate_broker_url(settings)?;
    validate_oids(settings)?;
    validate_field_names(settings)?;
    validate_delivery(settings)?;
    Ok(())
}

/// Declarative bounds from the settings types
fn validate_bounds(settings: &RelaySettings) -> Result<(), ContractError> {
    settings
        .validate()
        .map_err(|e| ContractError::config_validation("settings", e.to_string()))
}

fn validate_broker_url(settings: &RelaySettings) -> Result<(), ContractError> {
    settings.mqtt.broker().map(|_| ())
}

/// Every OID must parse
fn validate_oids(settings: &RelaySettings) -> Result<(), ContractError> {
    if settings.oids.is_empty() {
        return Err(ContractError::config_validation(
            "oids",
            "at least one OID must be configured",
        ));
    }
    settings.oid_bindings().map(|_| ())
}

/// Field names non-empty and unique across OIDs
fn validate_field_names(settings: &RelaySettings) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (oid, field) in &settings.oids {
        if field.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("oids[{oid}]"),
                "field name cannot be empty",
            ));
        }
        if !seen.insert(field.as_str()) {
            return Err(ContractError::config_validation(
                format!("oids[{oid}]"),
                format!("duplicate field name '{field}'"),
            ));
        }
    }
    Ok(())
}

fn validate_delivery(settings: &RelaySettings) -> Result<(), ContractError> {
    let delivery = &settings.delivery;
    if let Some(capacity) = delivery.buffer_capacity {
        if capacity < delivery.max_chunk {
            return Err(ContractError::config_validation(
                "delivery.bufferCapacity",
                format!(
                    "bufferCapacity ({capacity}) must be >= maxChunk ({})",
                    delivery.max_chunk
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DeliverySettings, MqttSettings};
    use std::collections::BTreeMap;

    fn minimal_settings() -> RelaySettings {
        RelaySettings {
            mqtt: MqttSettings {
                url: "mqtt://localhost:1883".into(),
                username: "relay".into(),
                password: None,
                topic: "site/device".into(),
                client_id: "snmpClient".into(),
                clean_session: false,
                keep_alive_secs: 60,
                reconnect_period_ms: 1000,
            },
            interval: 1000,
            submit_every: 1.0,
            community: "public".into(),
            ip: "127.0.0.1".into(),
            port: 161,
            timeout_ms: 5000,
            oids: BTreeMap::from([
                ("1.3.6.1.2.1.1.3.0".to_string(), "uptime".to_string()),
                ("1.3.6.1.2.1.1.5.0".to_string(), "name".to_string()),
            ]),
            delivery: DeliverySettings::default(),
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(validate(&minimal_settings()).is_ok());
    }

    #[test]
    fn test_empty_topic() {
        let mut settings = minimal_settings();
        settings.mqtt.topic = String::new();
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("topic"), "got: {err}");
    }

    #[test]
    fn test_negative_quiet_period() {
        let mut settings = minimal_settings();
        settings.submit_every = -1.0;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("submit_every"), "got: {err}");
    }

    #[test]
    fn test_unsupported_broker_scheme() {
        let mut settings = minimal_settings();
        settings.mqtt.url = "http://localhost".into();
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("unsupported scheme"), "got: {err}");
    }

    #[test]
    fn test_no_oids() {
        let mut settings = minimal_settings();
        settings.oids.clear();
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("at least one OID"), "got: {err}");
    }

    #[test]
    fn test_malformed_oid() {
        let mut settings = minimal_settings();
        settings
            .oids
            .insert("1.3.six.1".to_string(), "bad".to_string());
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("invalid OID"), "got: {err}");
    }

    #[test]
    fn test_duplicate_field_name() {
        let mut settings = minimal_settings();
        settings
            .oids
            .insert("1.3.6.1.2.1.1.1.0".to_string(), "uptime".to_string());
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("duplicate field name"), "got: {err}");
    }

    #[test]
    fn test_capacity_smaller_than_chunk() {
        let mut settings = minimal_settings();
        settings.delivery.max_chunk = 10;
        settings.delivery.buffer_capacity = Some(5);
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("bufferCapacity"), "got: {err}");
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let mut settings = minimal_settings();
        settings.delivery.max_chunk = 0;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("max_chunk"), "got: {err}");
    }
}
