//! Transport error types

use contracts::ContractError;
use thiserror::Error;

/// Transport specific error
#[derive(Debug, Error)]
pub enum TransportError {
    /// Client could not be configured
    #[error("invalid MQTT client setup: {message}")]
    ClientSetup { message: String },

    /// Request could not be handed to the event loop
    #[error("MQTT request rejected: {message}")]
    RequestRejected { message: String },

    /// Connection dropped before the broker acknowledged the publish
    #[error("publish not acknowledged: {reason}")]
    NotAcknowledged { reason: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TransportError {
    /// Create an unacknowledged publish error
    pub fn not_acknowledged(reason: impl Into<String>) -> Self {
        Self::NotAcknowledged {
            reason: reason.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TransportError>;
