//! Publisher trait - the "publish one message" capability of the transport

use bytes::Bytes;

use crate::ContractError;

/// Outbound transport abstraction
///
/// A call resolves only once the transport has accepted the message with an
/// acknowledgment-required guarantee (QoS 1 for MQTT).
#[trait_variant::make(Publisher: Send)]
pub trait LocalPublisher {
    /// Publisher name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Publish one payload to `topic`
    ///
    /// # Errors
    /// Returns a publish error if the transport rejects the message or the
    /// connection drops before it is acknowledged.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), ContractError>;
}
