//! RelayService - single task owning the buffer, tracker and delivery chain
//!
//! Every mutation happens on this task. Pushes and transport events arrive
//! over one command channel; the in-flight publish, the pacing delay and the
//! dispatcher tick are multiplexed with it in a single `select!`.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use contracts::{ContractError, Envelope, Publisher, Record, TransportEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, instrument, trace, warn};

use crate::buffer::{PushOutcome, SampleBuffer};
use crate::config::RelayConfig;
use crate::delivery::{next_action, restore_chunk, DeliveryAction};
use crate::error::Result;
use crate::handle::{channel, RelayHandle, RelayInbox};
use crate::metrics::RelayMetrics;
use crate::tracker::TransportTracker;

/// Commands accepted by the relay task
pub(crate) enum Command {
    Push(Record),
    Transport(TransportEvent),
    Flush,
    Shutdown(oneshot::Sender<usize>),
}

type PublishFuture = Pin<Box<dyn Future<Output = std::result::Result<(), ContractError>> + Send>>;

/// Where the current flush chain is
///
/// Anything but `Idle` means a chain holds the "sending" lock.
enum DeliveryState {
    Idle,
    Publishing {
        chunk: Vec<Record>,
        rest: VecDeque<Record>,
        started: Instant,
        future: PublishFuture,
    },
    Pacing {
        rest: VecDeque<Record>,
        sleep: Pin<Box<Sleep>>,
    },
}

impl DeliveryState {
    fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    fn held_records(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Publishing { chunk, rest, .. } => chunk.len() + rest.len(),
            Self::Pacing { rest, .. } => rest.len(),
        }
    }
}

enum Progress {
    Published(std::result::Result<(), ContractError>),
    Paced,
}

/// Resolves when the current chain step completes; pending while idle
async fn progress(state: &mut DeliveryState) -> Progress {
    match state {
        DeliveryState::Idle => std::future::pending().await,
        DeliveryState::Publishing { future, .. } => Progress::Published(future.as_mut().await),
        DeliveryState::Pacing { sleep, .. } => {
            sleep.as_mut().await;
            Progress::Paced
        }
    }
}

/// The relay core
pub struct RelayService<P> {
    config: RelayConfig,
    publisher: Arc<P>,
    buffer: SampleBuffer,
    tracker: TransportTracker,
    delivery: DeliveryState,
    metrics: Arc<RelayMetrics>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<P> RelayService<P>
where
    P: Publisher + Sync + 'static,
{
    /// Create the service on the receiving end of `inbox`
    ///
    /// Handles from the same `relay::channel()` call may be used before the
    /// service exists; their commands queue up until `run` starts.
    pub fn new(publisher: P, config: RelayConfig, inbox: RelayInbox) -> Result<Self> {
        config.check()?;

        Ok(Self {
            buffer: SampleBuffer::with_limit(config.buffer_capacity, config.overflow_policy),
            tracker: TransportTracker::new(config.flush_interval),
            delivery: DeliveryState::Idle,
            publisher: Arc::new(publisher),
            metrics: inbox.metrics,
            commands: inbox.commands,
            config,
        })
    }

    /// Create a fresh channel and service, and run it as a background task
    pub fn spawn(publisher: P, config: RelayConfig) -> Result<(RelayHandle, JoinHandle<()>)> {
        let (handle, inbox) = channel();
        let service = Self::new(publisher, config, inbox)?;
        let task = tokio::spawn(service.run());
        Ok((handle, task))
    }

    /// Run until shut down or until every handle is dropped
    #[instrument(name = "relay_run", skip(self), fields(topic = %self.config.topic))]
    pub async fn run(mut self) {
        info!(
            publisher = %self.publisher.name(),
            max_chunk = self.config.max_chunk,
            "Relay started"
        );

        loop {
            tokio::select! {
                // transport events must be seen before a publish outcome
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Push(record)) => self.push(record),
                    Some(Command::Transport(event)) => self.tracker.apply(event),
                    Some(Command::Flush) => self.try_flush(),
                    Some(Command::Shutdown(reply)) => {
                        let undelivered = self.stop();
                        let _ = reply.send(undelivered);
                        return;
                    }
                    None => {
                        self.stop();
                        return;
                    }
                },
                step = progress(&mut self.delivery) => self.on_progress(step),
                _ = self.tracker.tick() => self.try_flush(),
            }
        }
    }

    fn push(&mut self, record: Record) {
        match self.buffer.push(record) {
            PushOutcome::Queued => {}
            PushOutcome::EvictedOldest => {
                warn!(capacity = ?self.config.buffer_capacity, "Buffer full, oldest record dropped");
                self.metrics.inc_dropped();
            }
            PushOutcome::Rejected => {
                warn!(capacity = ?self.config.buffer_capacity, "Buffer full, new record dropped");
                self.metrics.inc_dropped();
                return;
            }
        }
        trace!(depth = self.buffer.len(), "record buffered");
        self.metrics.inc_buffered(self.buffer.len());
    }

    /// Dispatcher gate: start a chain if connected and none is running
    fn try_flush(&mut self) {
        if !self.tracker.state().is_connected() {
            trace!("flush skipped, not connected");
            return;
        }
        if !self.delivery.is_idle() {
            debug!("flush skipped, previous chain still sending");
            return;
        }

        let snapshot = self.buffer.take_all();
        self.metrics.set_buffer_depth(0);
        if snapshot.is_empty() {
            return;
        }

        debug!(records = snapshot.len(), "Flushing buffer");
        self.metrics.inc_flushes(snapshot.len());
        self.advance(snapshot);
    }

    /// Take the next chain step: start a publish, or end the chain
    fn advance(&mut self, pending: VecDeque<Record>) {
        self.delivery = DeliveryState::Idle;
        match next_action(pending, self.tracker.state(), self.config.max_chunk) {
            DeliveryAction::Requeue(records) => {
                if !records.is_empty() {
                    warn!(records = records.len(), "MQTT disconnected while sending data");
                    self.hold_back(records);
                }
            }
            DeliveryAction::Finish => debug!("Flush complete"),
            DeliveryAction::Publish { chunk, rest } => match self.begin_publish(&chunk) {
                Ok(future) => {
                    self.delivery = DeliveryState::Publishing {
                        chunk,
                        rest,
                        started: Instant::now(),
                        future,
                    };
                }
                // records are plain scalars, so this only fires on a broken encoder
                Err(e) => {
                    warn!(error = %e, records = chunk.len(), "Envelope encoding failed, chain stopped");
                    self.hold_back(restore_chunk(chunk, rest));
                }
            },
        }
    }

    /// Return undelivered records to the front of the buffer
    fn hold_back(&mut self, records: VecDeque<Record>) {
        self.metrics.add_requeued(records.len());
        self.buffer.requeue_front(records);
        self.metrics.set_buffer_depth(self.buffer.len());
    }

    /// Build a fresh envelope for `chunk` and start publishing it
    fn begin_publish(&self, chunk: &[Record]) -> std::result::Result<PublishFuture, ContractError> {
        let payload = Envelope::new(chunk.to_vec()).encode()?;
        let publisher = Arc::clone(&self.publisher);
        let topic = self.config.topic.clone();
        Ok(Box::pin(async move { publisher.publish(&topic, payload).await }))
    }

    fn on_progress(&mut self, step: Progress) {
        let state = std::mem::replace(&mut self.delivery, DeliveryState::Idle);
        match (state, step) {
            (
                DeliveryState::Publishing {
                    chunk,
                    rest,
                    started,
                    ..
                },
                Progress::Published(Ok(())),
            ) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                debug!(records = chunk.len(), latency_ms, "Envelope published");
                self.metrics.add_published(chunk.len(), latency_ms);
                self.delivery = DeliveryState::Pacing {
                    rest,
                    sleep: Box::pin(tokio::time::sleep(self.config.pacing)),
                };
            }
            (DeliveryState::Publishing { chunk, rest, .. }, Progress::Published(Err(e))) => {
                warn!(error = %e, records = chunk.len(), "Transport failed while sending data");
                self.metrics.inc_publish_failures();
                self.advance(restore_chunk(chunk, rest));
            }
            (DeliveryState::Pacing { rest, .. }, Progress::Paced) => self.advance(rest),
            (state, _) => self.delivery = state,
        }
    }

    /// Tear down; returns how many records were never delivered
    fn stop(&mut self) -> usize {
        self.tracker.stop_timer();
        let undelivered = self.buffer.len() + self.delivery.held_records();
        self.delivery = DeliveryState::Idle;
        info!(undelivered, dropped = self.buffer.dropped(), "Relay stopped");
        undelivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DropPolicy, ScalarValue};
    use std::time::Duration;
    use transport::MockPublisher;

    fn rec(n: i64) -> Record {
        [("n", n)].into_iter().collect()
    }

    fn numbers(envelopes: &[Envelope]) -> Vec<i64> {
        envelopes
            .iter()
            .flat_map(|e| e.data.iter())
            .map(|r| match r.get("n") {
                Some(ScalarValue::Integer(n)) => *n,
                other => panic!("unexpected value {other:?}"),
            })
            .collect()
    }

    fn attempted(publisher: &MockPublisher) -> Vec<Envelope> {
        publisher
            .attempts()
            .iter()
            .map(|(_, payload)| Envelope::decode(payload).unwrap())
            .collect()
    }

    /// Encoded `data` with the timestamp pinned, for byte comparison
    fn data_bytes(envelope: &Envelope) -> Vec<u8> {
        Envelope::at(0, envelope.data.clone())
            .encode()
            .unwrap()
            .to_vec()
    }

    fn spawn(publisher: &MockPublisher, config: RelayConfig) -> RelayHandle {
        let (handle, _task) = RelayService::spawn(publisher.clone(), config).unwrap();
        handle
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_one_record_per_envelope() {
        let publisher = MockPublisher::new("mock");
        let handle = spawn(&publisher, RelayConfig::new("plant/ups1"));

        handle.notify(TransportEvent::Connect).unwrap();
        for n in 1..=4 {
            handle.push(rec(n)).unwrap();
        }
        wait(5_000).await;

        let envelopes = publisher.delivered_envelopes();
        assert_eq!(envelopes.len(), 4);
        assert!(envelopes.iter().all(|e| e.data.len() == 1));
        assert_eq!(numbers(&envelopes), vec![1, 2, 3, 4]);
        assert!(publisher
            .delivered()
            .iter()
            .all(|(topic, _)| topic == "plant/ups1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_publishes() {
        let publisher = MockPublisher::new("mock");
        let handle = spawn(&publisher, RelayConfig::new("t"));

        handle.notify(TransportEvent::Connect).unwrap();
        handle.push(rec(1)).unwrap();
        handle.push(rec(2)).unwrap();

        // first tick at 1000ms publishes one record, the next follows 200ms later
        wait(1_100).await;
        assert_eq!(publisher.delivered().len(), 1);
        wait(200).await;
        assert_eq!(publisher.delivered().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_loss_while_disconnected() {
        let publisher = MockPublisher::new("mock");
        let handle = spawn(&publisher, RelayConfig::new("t"));

        for n in 1..=3 {
            handle.push(rec(n)).unwrap();
        }
        wait(5_000).await;
        assert!(publisher.attempts().is_empty());

        handle.notify(TransportEvent::Connect).unwrap();
        wait(5_000).await;
        assert_eq!(numbers(&publisher.delivered_envelopes()), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_mid_chain_requeues_at_front() {
        let publisher = MockPublisher::new("mock").with_latency(Duration::from_millis(100));
        let handle = spawn(&publisher, RelayConfig::new("t"));

        handle.notify(TransportEvent::Connect).unwrap();
        for n in 1..=3 {
            handle.push(rec(n)).unwrap();
        }

        // chain starts at 1000ms; the first publish is mid-send at 1050ms
        wait(1_050).await;
        handle.notify(TransportEvent::Close).unwrap();
        handle.push(rec(4)).unwrap();
        wait(3_000).await;

        // the in-flight envelope still completed; the rest went back to the buffer
        assert_eq!(numbers(&publisher.delivered_envelopes()), vec![1]);
        assert_eq!(handle.metrics().requeued, 2);

        handle.notify(TransportEvent::Connect).unwrap();
        wait(5_000).await;
        assert_eq!(numbers(&publisher.delivered_envelopes()), vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failed_by_disconnect_requeues_chunk_first() {
        let publisher = MockPublisher::new("mock").with_latency(Duration::from_millis(100));
        publisher.set_always_fail(true);
        let handle = spawn(&publisher, RelayConfig::new("t"));

        handle.notify(TransportEvent::Connect).unwrap();
        for n in 1..=3 {
            handle.push(rec(n)).unwrap();
        }

        // the link drops while record 1 is on the wire; its publish then fails
        wait(1_050).await;
        handle.notify(TransportEvent::Offline).unwrap();
        handle.notify(TransportEvent::Close).unwrap();
        wait(3_000).await;

        assert_eq!(publisher.attempts().len(), 1);
        assert!(publisher.delivered().is_empty());
        let metrics = handle.metrics();
        assert_eq!(metrics.publish_failures, 1);
        assert_eq!(metrics.requeued, 3);
        assert_eq!(metrics.buffer_depth, 3);

        publisher.set_always_fail(false);
        handle.notify(TransportEvent::Reconnect).unwrap();
        handle.notify(TransportEvent::Connect).unwrap();
        wait(5_000).await;

        assert_eq!(numbers(&publisher.delivered_envelopes()), vec![1, 2, 3]);
        assert_eq!(publisher.attempts().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_chain_in_flight() {
        let publisher = MockPublisher::new("mock").with_latency(Duration::from_millis(500));
        let handle = spawn(&publisher, RelayConfig::new("t"));

        handle.notify(TransportEvent::Connect).unwrap();
        handle.push(rec(1)).unwrap();
        handle.push(rec(2)).unwrap();

        wait(1_100).await;
        handle.flush_now().unwrap();
        handle.flush_now().unwrap();
        handle.push(rec(3)).unwrap();
        wait(10_000).await;

        assert_eq!(numbers(&attempted(&publisher)), vec![1, 2, 3]);
        // the chain for 1, 2 and a later one for 3
        assert_eq!(handle.metrics().flushes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_publish_resubmits_same_chunk() {
        let publisher = MockPublisher::new("mock");
        publisher.fail_next(1);
        let handle = spawn(&publisher, RelayConfig::new("t"));

        handle.notify(TransportEvent::Connect).unwrap();
        handle.push(rec(1)).unwrap();
        handle.push(rec(2)).unwrap();
        wait(5_000).await;

        let attempts = attempted(&publisher);
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].data, attempts[1].data);
        assert_eq!(data_bytes(&attempts[0]), data_bytes(&attempts[1]));
        assert_eq!(numbers(&publisher.delivered_envelopes()), vec![1, 2]);
        assert_eq!(handle.metrics().publish_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_flush_is_noop() {
        let publisher = MockPublisher::new("mock");
        let handle = spawn(&publisher, RelayConfig::new("t"));

        handle.notify(TransportEvent::Connect).unwrap();
        handle.flush_now().unwrap();
        wait(3_000).await;

        assert!(publisher.attempts().is_empty());
        assert_eq!(handle.metrics().flushes, 0);

        // gate released: a later record still goes out
        handle.push(rec(7)).unwrap();
        wait(2_000).await;
        assert_eq!(publisher.delivered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_undelivered() {
        let publisher = MockPublisher::new("mock");
        let handle = spawn(&publisher, RelayConfig::new("t"));

        for n in 1..=3 {
            handle.push(rec(n)).unwrap();
        }
        assert_eq!(handle.shutdown().await.unwrap(), 3);
        assert!(handle.push(rec(4)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_buffer_drops_oldest() {
        let publisher = MockPublisher::new("mock");
        let mut config = RelayConfig::new("t");
        config.buffer_capacity = Some(2);
        config.overflow_policy = DropPolicy::DropOldest;
        let handle = spawn(&publisher, config);

        for n in 1..=3 {
            handle.push(rec(n)).unwrap();
        }
        handle.notify(TransportEvent::Connect).unwrap();
        wait(5_000).await;

        assert_eq!(numbers(&publisher.delivered_envelopes()), vec![2, 3]);
        assert_eq!(handle.metrics().dropped, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = RelayConfig::new("t");
        config.max_chunk = 0;
        let (_handle, inbox) = channel();
        assert!(RelayService::new(MockPublisher::new("mock"), config, inbox).is_err());
    }
}
