//! Envelope - the wire container sent in one publish call

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, Record};

/// One outbound message: `{ "timestamp": <epoch-ms>, "data": [ <record>, ... ] }`
///
/// Built fresh for every publish attempt, including retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Assembly time, epoch milliseconds
    pub timestamp: i64,
    /// Chunk of records, in buffer order
    pub data: Vec<Record>,
}

impl Envelope {
    /// Stamp a chunk with the current wall-clock time
    pub fn new(data: Vec<Record>) -> Self {
        Self::at(chrono::Utc::now().timestamp_millis(), data)
    }

    /// Build with an explicit timestamp
    pub fn at(timestamp: i64, data: Vec<Record>) -> Self {
        Self { timestamp, data }
    }

    /// JSON-encode for publishing
    pub fn encode(&self) -> Result<Bytes, ContractError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| ContractError::Serialization {
                message: format!("envelope encode error: {e}"),
            })
    }

    /// Decode a published payload
    pub fn decode(payload: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(payload).map_err(|e| ContractError::Serialization {
            message: format!("envelope decode error: {e}"),
        })
    }
}
