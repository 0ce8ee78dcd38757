//! Delivery protocol transitions
//!
//! One step of the chunk/pace/retry chain, as a pure function of the pending
//! records and the transport state. The service drives the chain; this module
//! only decides what the next step is.

use std::collections::VecDeque;

use contracts::{Record, TransportState};

/// Next step of a flush chain
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryAction {
    /// Transport is down: return these records to the front of the buffer
    Requeue(VecDeque<Record>),
    /// Publish `chunk` in one envelope, then continue with `rest`
    Publish {
        chunk: Vec<Record>,
        rest: VecDeque<Record>,
    },
    /// Nothing left; the chain ends
    Finish,
}

/// Decide the next step for `pending`
///
/// The disconnected check comes first, so a chain that observes a disconnect
/// hands back everything it still holds, in order.
pub fn next_action(
    mut pending: VecDeque<Record>,
    state: TransportState,
    max_chunk: usize,
) -> DeliveryAction {
    if !state.is_connected() {
        return DeliveryAction::Requeue(pending);
    }

    let take = max_chunk.max(1).min(pending.len());
    if take == 0 {
        return DeliveryAction::Finish;
    }

    let chunk: Vec<Record> = pending.drain(..take).collect();
    DeliveryAction::Publish {
        chunk,
        rest: pending,
    }
}

/// Undo a failed attempt: put `chunk` back ahead of `rest`
pub fn restore_chunk(chunk: Vec<Record>, mut rest: VecDeque<Record>) -> VecDeque<Record> {
    for record in chunk.into_iter().rev() {
        rest.push_front(record);
    }
    rest
}
