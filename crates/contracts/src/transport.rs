//! Transport lifecycle contracts
//!
//! The relay never owns the connection; it only observes these events.

use std::fmt;
use std::sync::Arc;

/// Connection state of the publish transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Disconnected,
    Connected,
}

impl TransportState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Lifecycle events emitted by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Session established
    Connect,
    /// A reconnect attempt is starting
    Reconnect,
    /// The connection closed
    Close,
    /// The client went offline
    Offline,
}

impl TransportEvent {
    /// State the transport is in after this event
    pub fn resulting_state(self) -> TransportState {
        match self {
            Self::Connect => TransportState::Connected,
            Self::Reconnect | Self::Close | Self::Offline => TransportState::Disconnected,
        }
    }
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Reconnect => "reconnect",
            Self::Close => "close",
            Self::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// Transport event callback type
///
/// The transport adapter invokes this for every lifecycle event.
pub type TransportEventCallback = Arc<dyn Fn(TransportEvent) + Send + Sync>;
