//! Publish acknowledgement tracking
//!
//! The MQTT event loop reports a packet id when a publish leaves the socket and
//! again when the broker acknowledges it. Publishers register a waiter before
//! queueing the request; waiters are assigned packet ids in queue order.
//!
//! With a persistent session the client replays unacknowledged publishes after
//! reconnecting. Their waiters were already failed, so the replayed packet ids
//! are remembered and never handed to a new waiter.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::trace;

use crate::error::TransportError;

type Waiter = oneshot::Sender<Result<(), TransportError>>;

#[derive(Default)]
struct AckState {
    unassigned: VecDeque<Waiter>,
    inflight: HashMap<u16, Waiter>,
    /// Packet ids the client will resend without a waiter
    replayed: HashSet<u16>,
}

/// Matches outgoing publishes with broker acknowledgements
pub struct AckTracker {
    state: Mutex<AckState>,
    persistent_session: bool,
}

impl AckTracker {
    /// `persistent_session` enables replay tracking across reconnects
    pub fn new(persistent_session: bool) -> Self {
        Self {
            state: Mutex::new(AckState::default()),
            persistent_session,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AckState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a waiter for the next publish handed to the event loop
    pub fn register(&self) -> oneshot::Receiver<Result<(), TransportError>> {
        let (tx, rx) = oneshot::channel();
        self.lock().unassigned.push_back(tx);
        rx
    }

    /// Drop the most recently registered waiter (its request never reached the loop)
    pub fn cancel_last(&self) {
        self.lock().unassigned.pop_back();
    }

    /// A publish with `pkid` was written to the connection
    pub fn on_outgoing(&self, pkid: u16) {
        let mut state = self.lock();
        if state.replayed.contains(&pkid) {
            trace!(pkid, "replayed publish on the wire");
            return;
        }
        match state.unassigned.pop_front() {
            Some(waiter) => {
                trace!(pkid, "publish on the wire");
                state.inflight.insert(pkid, waiter);
            }
            None => trace!(pkid, "outgoing publish without waiter (replay)"),
        }
    }

    /// The broker acknowledged `pkid`
    pub fn on_ack(&self, pkid: u16) {
        let mut state = self.lock();
        if state.replayed.remove(&pkid) {
            trace!(pkid, "replayed publish acknowledged");
            return;
        }
        if let Some(waiter) = state.inflight.remove(&pkid) {
            let _ = waiter.send(Ok(()));
        }
    }

    /// Fail every pending waiter
    pub fn fail_all(&self, reason: &str) {
        let mut state = self.lock();
        let unassigned = std::mem::take(&mut state.unassigned);
        let inflight = std::mem::take(&mut state.inflight);
        if self.persistent_session {
            state.replayed.extend(inflight.keys().copied());
        }
        drop(state);

        for waiter in unassigned.into_iter().chain(inflight.into_values()) {
            let _ = waiter.send(Err(TransportError::not_acknowledged(reason)));
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        let state = self.lock();
        state.unassigned.len() + state.inflight.len()
    }
}
