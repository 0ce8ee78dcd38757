//! Relay configuration

use std::time::Duration;

use contracts::{DropPolicy, RelaySettings};

use crate::error::{RelayError, Result};

/// Runtime configuration of the relay service
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Publish destination
    pub topic: String,
    /// Dispatcher period
    pub flush_interval: Duration,
    /// Delay after each acknowledged publish
    pub pacing: Duration,
    /// Maximum records per envelope
    pub max_chunk: usize,
    /// Sample buffer bound (None = unbounded)
    pub buffer_capacity: Option<usize>,
    /// Overflow policy when the bound is hit
    pub overflow_policy: DropPolicy,
}

impl RelayConfig {
    /// Defaults for `topic`: 1s flush period, 200ms pacing, one record per envelope
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            flush_interval: Duration::from_secs(1),
            pacing: Duration::from_millis(200),
            max_chunk: 1,
            buffer_capacity: None,
            overflow_policy: DropPolicy::default(),
        }
    }

    /// Build from the settings document
    pub fn from_settings(settings: &RelaySettings) -> Self {
        let delivery = &settings.delivery;
        Self {
            topic: settings.mqtt.topic.clone(),
            flush_interval: delivery.flush_interval(),
            pacing: delivery.pacing(),
            max_chunk: delivery.max_chunk,
            buffer_capacity: delivery.buffer_capacity,
            overflow_policy: delivery.overflow_policy,
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(RelayError::invalid_config("topic must not be empty"));
        }
        if self.flush_interval.is_zero() {
            return Err(RelayError::invalid_config("flush interval must be positive"));
        }
        if self.max_chunk == 0 {
            return Err(RelayError::invalid_config("max chunk must be at least 1"));
        }
        if self.buffer_capacity == Some(0) {
            return Err(RelayError::invalid_config("buffer capacity must be at least 1"));
        }
        Ok(())
    }
}
