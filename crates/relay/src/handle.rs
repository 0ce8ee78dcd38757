//! RelayHandle - cloneable front door to a running relay

use std::sync::Arc;

use contracts::{Record, TransportEvent, TransportEventCallback};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::error::{RelayError, Result};
use crate::metrics::{RelayMetrics, RelayMetricsSnapshot};
use crate::service::Command;

/// Receiving end of a relay channel, consumed by `RelayService::new`
pub struct RelayInbox {
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
    pub(crate) metrics: Arc<RelayMetrics>,
}

/// Create a handle and the inbox a `RelayService` will drain
pub fn channel() -> (RelayHandle, RelayInbox) {
    let (tx, commands) = mpsc::unbounded_channel();
    let metrics = Arc::new(RelayMetrics::new());
    let handle = RelayHandle::new(tx, Arc::clone(&metrics));
    (handle, RelayInbox { commands, metrics })
}

/// Handle to a running relay task
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<Command>,
    metrics: Arc<RelayMetrics>,
}

impl RelayHandle {
    fn new(tx: mpsc::UnboundedSender<Command>, metrics: Arc<RelayMetrics>) -> Self {
        Self { tx, metrics }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| RelayError::Closed)
    }

    /// Append a record to the sample buffer
    pub fn push(&self, record: Record) -> Result<()> {
        self.send(Command::Push(record))
    }

    /// Report a transport lifecycle event
    pub fn notify(&self, event: TransportEvent) -> Result<()> {
        self.send(Command::Transport(event))
    }

    /// Run the dispatcher gate now instead of waiting for the next tick
    pub fn flush_now(&self) -> Result<()> {
        self.send(Command::Flush)
    }

    /// Callback to hand to a transport adapter
    pub fn event_callback(&self) -> TransportEventCallback {
        let handle = self.clone();
        Arc::new(move |event| {
            if handle.notify(event).is_err() {
                debug!(event = %event, "relay stopped, transport event ignored");
            }
        })
    }

    /// Current counters
    pub fn metrics(&self) -> RelayMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop the relay and return how many records were never delivered
    #[instrument(name = "relay_handle_shutdown", skip(self))]
    pub async fn shutdown(&self) -> Result<usize> {
        let (reply, undelivered) = oneshot::channel();
        self.send(Command::Shutdown(reply))?;
        undelivered.await.map_err(|_| RelayError::Closed)
    }
}
