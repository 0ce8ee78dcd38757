//! # Integration Tests
//!
//! End-to-end tests across crates, all on a paused tokio clock.
//!
//! Covers:
//! - settings document to running pipeline
//! - poll -> buffer -> publish with mock source and publisher (no device, no broker)
//! - broker outages and failed publishes

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use relay::RelayConfig;

    #[test]
    fn test_settings_drive_relay_config() {
        let settings = ConfigLoader::load_from_str(
            r#"
            interval = 2000
            submitEvery = 0.5
            community = "public"
            ip = "10.0.0.20"

            [mqtt]
            url = "mqtt://broker.example:1884"
            username = "relay"
            topic = "plant/ups1"

            [oids]
            "1.3.6.1.2.1.1.3.0" = "uptime"

            [delivery]
            pacingMs = 50
            maxChunk = 4
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let config = RelayConfig::from_settings(&settings);
        assert_eq!(config.topic, "plant/ups1");
        assert_eq!(config.max_chunk, 4);
        assert_eq!(config.pacing.as_millis(), 50);
        assert_eq!(settings.quiet_period().as_secs(), 30);
        assert_eq!(settings.mqtt.broker().unwrap().port, 1884);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use contracts::{ContractError, Envelope, Record, ScalarValue, TransportEvent};
    use device::MockSampleSource;
    use relay::{PollScheduler, RelayConfig, RelayHandle, RelayService};
    use tokio::task::JoinHandle;
    use transport::MockPublisher;

    fn start_relay(publisher: &MockPublisher, config: RelayConfig) -> (RelayHandle, JoinHandle<()>) {
        let (relay, inbox) = relay::channel();
        let service = RelayService::new(publisher.clone(), config, inbox).unwrap();
        (relay, tokio::spawn(service.run()))
    }

    fn uptimes(envelopes: &[Envelope]) -> Vec<u64> {
        envelopes
            .iter()
            .flat_map(|e| e.data.iter())
            .map(|r| match r.get("uptime") {
                // small unsigned values decode back as integers
                Some(ScalarValue::Integer(n)) => *n as u64,
                Some(ScalarValue::Unsigned(n)) => *n,
                other => panic!("unexpected uptime {other:?}"),
            })
            .collect()
    }

    fn seq(n: i64) -> Record {
        [("seq", n)].into_iter().collect()
    }

    fn seqs(envelopes: &[Envelope]) -> Vec<i64> {
        envelopes
            .iter()
            .flat_map(|e| e.data.iter())
            .map(|r| match r.get("seq") {
                Some(ScalarValue::Integer(n)) => *n,
                other => panic!("unexpected seq {other:?}"),
            })
            .collect()
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// End-to-end test: MockSampleSource -> PollScheduler -> RelayService -> MockPublisher
    #[tokio::test(start_paused = true)]
    async fn test_e2e_mock_pipeline() {
        let publisher = MockPublisher::new("mock");
        let (relay, relay_task) = start_relay(&publisher, RelayConfig::new("plant/ups1"));
        relay.notify(TransportEvent::Connect).unwrap();

        let source = MockSampleSource::synthetic("ups", ["uptime".to_string()]);
        let polls = source.call_counter();
        let scheduler = PollScheduler::new(
            source,
            relay.clone(),
            Duration::from_secs(1),
            Duration::ZERO,
        )
        .spawn();

        // polls land at 1s..=5s
        wait(5_500).await;
        scheduler.abort();

        let envelopes = publisher.delivered_envelopes();
        let delivered = uptimes(&envelopes);
        assert!(delivered.len() >= 4, "only {} delivered", delivered.len());
        assert_eq!(delivered, (1..=delivered.len() as u64).collect::<Vec<_>>());
        assert!(envelopes.iter().all(|e| e.data.len() == 1));

        let undelivered = relay.shutdown().await.unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 5);
        assert_eq!(delivered.len() + undelivered, 5);
        relay_task.await.unwrap();
    }

    /// Quiet period: after a successful poll nothing is polled for `submitEvery`
    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_spaces_polls() {
        let settings = config_loader::ConfigLoader::load_from_str(
            r#"{
                "mqtt": { "url": "mqtt://localhost", "username": "u", "topic": "t" },
                "interval": 1000,
                "submitEvery": 0.05,
                "community": "public",
                "ip": "127.0.0.1",
                "oids": { "1.3.6.1.2.1.1.3.0": "uptime" }
            }"#,
            config_loader::ConfigFormat::Json,
        )
        .unwrap();

        let publisher = MockPublisher::new("mock");
        let (relay, _task) = start_relay(&publisher, RelayConfig::from_settings(&settings));
        relay.notify(TransportEvent::Connect).unwrap();

        let source = MockSampleSource::synthetic("ups", settings.oids.values().cloned());
        let polls = source.call_counter();
        let scheduler = PollScheduler::from_settings(source, relay.clone(), &settings).spawn();

        // poll at 1s, quiet until 4s, next poll at 5s
        wait(4_500).await;
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        wait(1_000).await;
        assert_eq!(polls.load(Ordering::SeqCst), 2);

        scheduler.abort();
        wait(2_000).await;
        assert_eq!(uptimes(&publisher.delivered_envelopes()), vec![1, 2]);
    }

    /// Polls that fail produce nothing and do not stall later polls
    #[tokio::test(start_paused = true)]
    async fn test_failed_polls_are_skipped() {
        let publisher = MockPublisher::new("mock");
        let (relay, _task) = start_relay(&publisher, RelayConfig::new("t"));
        relay.notify(TransportEvent::Connect).unwrap();

        let source = MockSampleSource::scripted(
            "flaky",
            vec![
                Err(ContractError::poll("flaky", "timeout")),
                Ok(seq(1)),
                Err(ContractError::poll("flaky", "timeout")),
                Ok(seq(2)),
            ],
        );
        let scheduler =
            PollScheduler::new(source, relay.clone(), Duration::from_secs(1), Duration::ZERO)
                .spawn();

        wait(6_000).await;
        scheduler.abort();

        assert_eq!(seqs(&publisher.delivered_envelopes()), vec![1, 2]);
        assert_eq!(relay.metrics().buffered, 2);
    }

    /// Broker outage: records buffer while offline and flush in order on reconnect
    #[tokio::test(start_paused = true)]
    async fn test_outage_then_reconnect_delivers_everything() {
        let publisher = MockPublisher::new("mock");
        let (relay, _task) = start_relay(&publisher, RelayConfig::new("t"));

        relay.notify(TransportEvent::Connect).unwrap();
        relay.push(seq(1)).unwrap();
        wait(1_500).await;
        assert_eq!(seqs(&publisher.delivered_envelopes()), vec![1]);

        relay.notify(TransportEvent::Offline).unwrap();
        relay.notify(TransportEvent::Close).unwrap();
        for n in 2..=6 {
            relay.push(seq(n)).unwrap();
        }
        relay.notify(TransportEvent::Reconnect).unwrap();
        wait(10_000).await;
        assert_eq!(publisher.delivered().len(), 1);
        assert_eq!(relay.metrics().buffer_depth, 5);

        relay.notify(TransportEvent::Connect).unwrap();
        wait(3_000).await;
        assert_eq!(
            seqs(&publisher.delivered_envelopes()),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert_eq!(relay.shutdown().await.unwrap(), 0);
    }

    /// Failed publishes are retried until they go through, order kept
    #[tokio::test(start_paused = true)]
    async fn test_failed_publishes_are_retried() {
        let publisher = MockPublisher::new("mock").with_latency(Duration::from_millis(10));
        let (relay, _task) = start_relay(&publisher, RelayConfig::new("t"));
        relay.notify(TransportEvent::Connect).unwrap();

        for n in 1..=3 {
            relay.push(seq(n)).unwrap();
        }
        publisher.fail_next(2);
        wait(3_000).await;

        assert_eq!(seqs(&publisher.delivered_envelopes()), vec![1, 2, 3]);
        assert_eq!(publisher.attempts().len(), 5);

        let metrics = relay.metrics();
        assert_eq!(metrics.publish_failures, 2);
        assert_eq!(metrics.records_published, 3);
    }

    /// Larger chunks pack several records per envelope
    #[tokio::test(start_paused = true)]
    async fn test_chunked_delivery() {
        let publisher = MockPublisher::new("mock");
        let mut config = RelayConfig::new("t");
        config.max_chunk = 2;
        let (relay, _task) = start_relay(&publisher, config);
        relay.notify(TransportEvent::Connect).unwrap();

        for n in 1..=5 {
            relay.push(seq(n)).unwrap();
        }
        wait(2_000).await;

        let envelopes = publisher.delivered_envelopes();
        let sizes: Vec<usize> = envelopes.iter().map(|e| e.data.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(seqs(&envelopes), vec![1, 2, 3, 4, 5]);
    }
}
