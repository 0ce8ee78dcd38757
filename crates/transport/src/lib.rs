//! # Transport
//!
//! Publish transport for the relay.
//!
//! Responsibilities:
//! - Connect to the MQTT broker and keep reconnecting
//! - Report lifecycle changes as `TransportEvent`s
//! - Publish envelopes with QoS 1 and resolve once acknowledged
//! - Provide a mock publisher with failure injection
//!
//! ## Usage Example
//!
//! ```ignore
//! let (publisher, connection) = transport::connect(&settings.mqtt, handle.event_callback())?;
//! // ... hand `publisher` to the relay ...
//! connection.close().await;
//! ```

mod ack;
pub mod error;
pub mod mock;
pub mod mqtt;

pub use error::{Result, TransportError};
pub use mock::MockPublisher;
pub use mqtt::{connect, MqttConnection, MqttPublisher};
