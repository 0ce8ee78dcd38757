//! Frozen interface contracts shared by every crate of the relay.
//!
//! All business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Wall-clock epoch milliseconds (`i64`) stamp every outbound `Envelope`
//! - A `Record` carries no timestamp of its own; its position in the buffer is its order

mod envelope;
mod error;
mod publisher;
mod record;
mod sample_source;
mod settings;
mod transport;

pub use envelope::*;
pub use error::*;
pub use publisher::{LocalPublisher, Publisher};
pub use record::*;
pub use sample_source::{LocalSampleSource, SampleSource};
pub use settings::*;
pub use transport::*;
