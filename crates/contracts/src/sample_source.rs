//! SampleSource trait - polled data source abstraction
//!
//! Decouples the poll scheduler from the device protocol so the real SNMP
//! adapter and mock sources are interchangeable.

use crate::{ContractError, Record};

/// A source that produces one `Record` per polling round
#[trait_variant::make(SampleSource: Send)]
pub trait LocalSampleSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Run one polling round
    ///
    /// # Errors
    /// Returns a poll error when the round as a whole failed; no record is
    /// produced for that round.
    async fn poll(&mut self) -> Result<Record, ContractError>;
}
