//! # Device
//!
//! Sample sources for the relay.
//!
//! Responsibilities:
//! - Poll a device for the configured OIDs and return one `Record` per round
//! - Map device value types onto `ScalarValue`
//! - Provide a mock source for tests and for builds without SNMP support
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::SampleSource;
//! use device::SnmpSampleSource;
//!
//! let mut source = SnmpSampleSource::from_settings(&settings)?;
//! let record = source.poll().await?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use device::MockSampleSource;
//!
//! let mut source = MockSampleSource::synthetic("bench", ["uptime".to_string()]);
//! let record = source.poll().await?;
//! ```

mod error;
mod mock;
#[cfg(feature = "real-snmp")]
mod snmp_source;

// Re-exports
pub use error::{DeviceError, Result};
pub use mock::MockSampleSource;
#[cfg(feature = "real-snmp")]
pub use snmp_source::{SnmpSampleSource, SnmpTarget};
