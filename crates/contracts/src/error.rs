//! Layered error definitions
//!
//! Categorized by source: config / poll / publish

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sample Source Errors =====
    /// A polling round failed as a whole
    #[error("poll error from '{source_name}': {message}")]
    Poll {
        source_name: String,
        message: String,
    },

    // ===== Publish Errors =====
    /// A single publish call was rejected or never acknowledged
    #[error("publisher '{publisher}' failed to publish: {message}")]
    Publish { publisher: String, message: String },

    /// Envelope could not be encoded
    #[error("serialization error: {message}")]
    Serialization { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create poll error
    pub fn poll(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Poll {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(publisher: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            publisher: publisher.into(),
            message: message.into(),
        }
    }

}
