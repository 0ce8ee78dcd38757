//! # Relay
//!
//! Buffering and delivery core.
//!
//! Responsibilities:
//! - Buffer polled records in order
//! - Track the publish transport's connection state
//! - Flush the buffer only while connected, one chain at a time
//! - Publish in chunks with pacing, retrying failed chunks and requeueing on disconnect
//! - Schedule polls with a quiet period after each success

pub mod buffer;
pub mod config;
pub mod delivery;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod tracker;

pub use buffer::{PushOutcome, SampleBuffer};
pub use config::RelayConfig;
pub use contracts::{Publisher, Record, SampleSource, TransportEvent};
pub use delivery::{next_action, DeliveryAction};
pub use error::{RelayError, Result};
pub use handle::{channel, RelayHandle, RelayInbox};
pub use metrics::{RelayMetrics, RelayMetricsSnapshot};
pub use scheduler::PollScheduler;
pub use service::RelayService;
pub use tracker::TransportTracker;
