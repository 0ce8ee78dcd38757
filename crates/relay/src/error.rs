//! Relay error types

use thiserror::Error;

/// Relay-specific errors
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay task has stopped and no longer accepts commands
    #[error("relay is not running")]
    Closed,

    /// Invalid relay configuration
    #[error("invalid relay config: {message}")]
    InvalidConfig { message: String },

    /// Shared contract error
    #[error("relay error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl RelayError {
    /// Create a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Relay Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;
