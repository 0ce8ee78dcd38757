//! Mock publisher
//!
//! Records every publish attempt and can be told to fail. Clones share state,
//! so a test keeps one clone for assertions and hands another to the relay.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, Envelope, Publisher};
use tracing::trace;

#[derive(Default)]
struct Journal {
    attempts: Vec<(String, Bytes)>,
    delivered: Vec<(String, Bytes)>,
}

/// Mock publisher
#[derive(Clone)]
pub struct MockPublisher {
    name: String,
    journal: Arc<Mutex<Journal>>,
    fail_next: Arc<AtomicU32>,
    always_fail: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl MockPublisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            journal: Arc::new(Mutex::new(Journal::default())),
            fail_next: Arc::new(AtomicU32::new(0)),
            always_fail: Arc::new(AtomicBool::new(false)),
            latency: None,
        }
    }

    /// Delay each publish by `latency` before it resolves
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` publishes
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Fail every publish until switched off
    pub fn set_always_fail(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every payload handed to `publish`, including failed ones
    pub fn attempts(&self) -> Vec<(String, Bytes)> {
        self.journal().attempts.clone()
    }

    /// Payloads that were published successfully
    pub fn delivered(&self) -> Vec<(String, Bytes)> {
        self.journal().delivered.clone()
    }

    /// Successfully published payloads, decoded
    ///
    /// Payloads that fail to decode are skipped.
    pub fn delivered_envelopes(&self) -> Vec<Envelope> {
        self.delivered()
            .iter()
            .filter_map(|(_, payload)| Envelope::decode(payload).ok())
            .collect()
    }

    fn should_fail(&self) -> bool {
        if self.always_fail.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), ContractError> {
        self.journal()
            .attempts
            .push((topic.to_string(), payload.clone()));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.should_fail() {
            trace!(publisher = %self.name, "injected publish failure");
            return Err(ContractError::publish(&self.name, "injected failure"));
        }

        self.journal()
            .delivered
            .push((topic.to_string(), payload));
        Ok(())
    }
}
