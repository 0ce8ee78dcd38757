//! Mock sample sources
//!
//! Implements `SampleSource` without a device. Two modes:
//! - scripted: replays a queue of outcomes, for tests that need exact control
//! - synthetic: produces a record for the configured fields on every poll

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ContractError, Record, SampleSource, ScalarValue};
use tracing::trace;

use crate::error::DeviceError;

enum Mode {
    Scripted(VecDeque<Result<Record, ContractError>>),
    Synthetic(Vec<String>),
}

/// Mock sample source
pub struct MockSampleSource {
    name: String,
    mode: Mode,
    calls: Arc<AtomicU64>,
}

impl MockSampleSource {
    /// Replay `outcomes` in order, one per poll
    ///
    /// Once the script is exhausted every poll fails.
    pub fn scripted(
        name: impl Into<String>,
        outcomes: impl IntoIterator<Item = Result<Record, ContractError>>,
    ) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Scripted(outcomes.into_iter().collect()),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Produce a record with every field in `fields` on each poll
    ///
    /// Values are derived from the poll counter so consecutive records differ.
    pub fn synthetic(name: impl Into<String>, fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Synthetic(fields.into_iter().collect()),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of poll invocations
    pub fn call_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }

    fn synthesize(fields: &[String], round: u64) -> Record {
        fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let value = match idx % 3 {
                    0 => ScalarValue::Unsigned(round),
                    1 => ScalarValue::Integer(round as i64 * 10 + idx as i64),
                    _ => ScalarValue::Text(format!("sample-{round}")),
                };
                (field.clone(), value)
            })
            .collect()
    }
}

impl SampleSource for MockSampleSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&mut self) -> Result<Record, ContractError> {
        let round = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(source = %self.name, round, "mock poll");

        match &mut self.mode {
            Mode::Scripted(outcomes) => outcomes.pop_front().unwrap_or_else(|| {
                Err(ContractError::poll(
                    &self.name,
                    DeviceError::ScriptExhausted {
                        name: self.name.clone(),
                    }
                    .to_string(),
                ))
            }),
            Mode::Synthetic(fields) => Ok(Self::synthesize(fields, round)),
        }
    }
}
