//! MQTT publisher backed by rumqttc
//!
//! `connect` builds the client and spawns the event loop. Lifecycle changes are
//! reported through the supplied `TransportEventCallback`; publishes complete
//! once the broker acknowledges them (QoS 1).

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, MqttSettings, Publisher, TransportEvent, TransportEventCallback};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::ack::AckTracker;
use crate::error::{Result, TransportError};

/// Capacity of the request channel between client and event loop
const REQUEST_CAPACITY: usize = 64;

/// How long `close` waits for the disconnect to reach the broker
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Publisher half of an MQTT connection
#[derive(Clone)]
pub struct MqttPublisher {
    name: String,
    client: AsyncClient,
    acks: Arc<AckTracker>,
    send_lock: Arc<Mutex<()>>,
}

impl Publisher for MqttPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "mqtt_publish", skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(&self, topic: &str, payload: Bytes) -> std::result::Result<(), ContractError> {
        let ack = {
            // waiter order must match request order
            let _guard = self.send_lock.lock().await;
            let ack = self.acks.register();
            if let Err(e) = self
                .client
                .publish_bytes(topic, QoS::AtLeastOnce, false, payload)
                .await
            {
                self.acks.cancel_last();
                let err = TransportError::RequestRejected {
                    message: e.to_string(),
                };
                return Err(ContractError::publish(&self.name, err.to_string()));
            }
            ack
        };

        match ack.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ContractError::publish(&self.name, e.to_string())),
            Err(_) => Err(ContractError::publish(&self.name, "event loop stopped")),
        }
    }
}

/// Running event loop of an MQTT connection
pub struct MqttConnection {
    client: AsyncClient,
    task: JoinHandle<()>,
}

impl MqttConnection {
    /// Disconnect from the broker and stop the event loop
    pub async fn close(self) {
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "disconnect request not queued");
        }

        let mut task = self.task;
        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            task.abort();
        }
    }
}

/// Create the client and spawn its event loop
///
/// Must be called from within a tokio runtime. The first connection attempt
/// happens in the background; its outcome arrives through `on_event`.
pub fn connect(
    settings: &MqttSettings,
    on_event: TransportEventCallback,
) -> Result<(MqttPublisher, MqttConnection)> {
    let broker = settings.broker()?;
    if !settings.clean_session && settings.client_id.is_empty() {
        return Err(TransportError::ClientSetup {
            message: "a persistent session needs a client id".to_string(),
        });
    }

    let mut options = MqttOptions::new(settings.client_id.clone(), broker.host.clone(), broker.port);
    options.set_credentials(
        settings.username.clone(),
        settings.password.clone().unwrap_or_default(),
    );
    options.set_clean_session(settings.clean_session);
    options.set_keep_alive(settings.keep_alive());

    let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    let acks = Arc::new(AckTracker::new(!settings.clean_session));

    let task = tokio::spawn(drive(
        eventloop,
        Arc::clone(&acks),
        on_event,
        settings.reconnect_period(),
    ));

    info!(broker = %broker, client_id = %settings.client_id, "MQTT client started");

    let publisher = MqttPublisher {
        name: format!("mqtt://{broker}"),
        client: client.clone(),
        acks,
        send_lock: Arc::new(Mutex::new(())),
    };
    Ok((publisher, MqttConnection { client, task }))
}

async fn drive(
    mut eventloop: EventLoop,
    acks: Arc<AckTracker>,
    on_event: TransportEventCallback,
    reconnect_period: Duration,
) {
    let mut connected = false;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected = true;
                on_event(TransportEvent::Connect);
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => acks.on_ack(ack.pkid),
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => acks.on_outgoing(pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnect sent");
                on_event(TransportEvent::Close);
                acks.fail_all("client disconnected");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "MQTT connection error");
                // the relay must see the state change before the publish failure
                if std::mem::take(&mut connected) {
                    on_event(TransportEvent::Offline);
                }
                on_event(TransportEvent::Close);
                acks.fail_all(&e.to_string());

                tokio::time::sleep(reconnect_period).await;
                on_event(TransportEvent::Reconnect);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn settings(url: &str) -> MqttSettings {
        MqttSettings {
            url: url.to_string(),
            username: "relay".to_string(),
            password: None,
            topic: "plant/ups1".to_string(),
            client_id: "snmpClient".to_string(),
            clean_session: false,
            keep_alive_secs: 60,
            reconnect_period_ms: 50,
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let callback: TransportEventCallback = Arc::new(|_| {});
        let result = connect(&settings("http://broker.example"), callback);
        assert!(matches!(result, Err(TransportError::Contract(_))));
    }

    #[tokio::test]
    async fn test_unreachable_broker_reports_close_and_reconnect() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: TransportEventCallback =
            Arc::new(move |event| sink.lock().unwrap().push(event));

        // port 1 on loopback refuses connections
        let (_publisher, connection) = connect(&settings("mqtt://127.0.0.1:1"), callback).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if events.lock().unwrap().contains(&TransportEvent::Reconnect) {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "no reconnect event");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        connection.task.abort();

        let seen = events.lock().unwrap().clone();
        assert_eq!(seen[0], TransportEvent::Close);
        assert!(!seen.contains(&TransportEvent::Connect));
        assert!(!seen.contains(&TransportEvent::Offline));
    }
}
