//! Device error types

use thiserror::Error;

/// Device polling errors
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Session could not be opened
    #[error("failed to open session to {address}: {message}")]
    SessionSetup {
        /// Device address
        address: String,
        /// Error message
        message: String,
    },

    /// A GET request failed as a whole
    #[error("request for {oid} failed: {message}")]
    Request {
        /// Requested OID
        oid: String,
        /// Error message
        message: String,
    },

    /// Blocking worker failed
    #[error("poll worker failed: {message}")]
    Worker {
        /// Error message
        message: String,
    },

    /// Scripted mock source ran out of outcomes
    #[error("mock source '{name}' has no scripted outcome left")]
    ScriptExhausted {
        /// Source name
        name: String,
    },
}

/// Device Result type alias
pub type Result<T> = std::result::Result<T, DeviceError>;
