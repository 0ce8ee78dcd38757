//! # Config Loader
//!
//! Settings loading and parsing module.
//!
//! Responsibilities:
//! - Parse the JSON (native) or TOML settings document
//! - Validate settings legality
//! - Produce `RelaySettings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("settings.json")).unwrap();
//! println!("Topic: {}", settings.mqtt.topic);
//! ```

mod parser;
mod validator;

pub use contracts::RelaySettings;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Default settings document name
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Settings loader
///
/// Provides static methods to load settings from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from file path
    ///
    /// Detects format from file extension (.json / .toml).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure (including a missing required key)
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RelaySettings, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load settings from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RelaySettings, ContractError> {
        Self::parse_and_validate(content, format)
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("unable to read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RelaySettings, ContractError> {
        let settings = parser::parse(content, format)?;
        validator::validate(&settings)?;
        Ok(settings)
    }
}
