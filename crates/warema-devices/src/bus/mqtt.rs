//! rumqttc-backed bus.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Bus, BusEvent};
use crate::adapter::{AdapterError, AdapterResult};
use crate::topics::OFFLINE;

const DEFAULT_PORT: u16 = 1883;

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Generated when absent
    pub client_id: Option<String>,
    pub keep_alive: Duration,
}

impl MqttConfig {
    /// Parse `mqtt://host[:port]`, `tcp://host[:port]` or `host[:port]`.
    pub fn from_url(url: &str) -> AdapterResult<Self> {
        let rest = url
            .trim()
            .trim_start_matches("mqtt://")
            .trim_start_matches("tcp://")
            .trim_end_matches('/');

        if rest.is_empty() || rest.contains("://") {
            return Err(AdapterError::Configuration(format!(
                "Invalid MQTT server URL: {}",
                url
            )));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    AdapterError::Configuration(format!("Invalid MQTT port in {}", url))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(AdapterError::Configuration(format!(
                "Missing MQTT host in {}",
                url
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            username: None,
            password: None,
            client_id: None,
            keep_alive: Duration::from_secs(60),
        })
    }

    /// Empty strings count as absent.
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username.filter(|u| !u.is_empty());
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id.filter(|c| !c.is_empty());
        self
    }

    fn options(&self, bridge_state_topic: &str) -> MqttOptions {
        let client_id = self
            .client_id
            .clone()
            .unwrap_or_else(|| format!("warema-bridge-{}", Uuid::new_v4()));

        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_last_will(LastWill::new(
            bridge_state_topic,
            OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));

        if let Some(user) = &self.username {
            options.set_credentials(user, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

/// Bus handle over a rumqttc client.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client and spawn the event loop poller.
    ///
    /// The poller keeps running across broker outages (rumqttc reconnects on
    /// the next poll) and stops once the returned receiver is dropped.
    ///
    /// The event channel is unbounded: the poller is the only thing draining
    /// rumqttc's request queue, so it must never wait on the bridge while a
    /// handler is publishing and the broker echoes namespace topics back.
    pub fn connect(
        config: &MqttConfig,
        bridge_state_topic: &str,
    ) -> (Self, mpsc::UnboundedReceiver<BusEvent>) {
        let (client, eventloop) = AsyncClient::new(config.options(bridge_state_topic), 10);
        let (tx, rx) = mpsc::unbounded_channel();

        info!("Connecting to MQTT broker {}:{}", config.host, config.port);
        tokio::spawn(poll_events(eventloop, tx));

        (Self { client }, rx)
    }

    pub async fn disconnect(&self) -> AdapterResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))
    }
}

async fn poll_events(mut eventloop: EventLoop, tx: mpsc::UnboundedSender<BusEvent>) {
    let mut error_count: u32 = 0;

    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                error_count = 0;
                info!("MQTT connection acknowledged");
                BusEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => BusEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            },
            Ok(_) => continue,
            Err(e) => {
                error_count += 1;
                if error_count == 1 {
                    error!("MQTT connection error: {}", e);
                } else {
                    warn!("MQTT connection error ({} in a row): {}", error_count, e);
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        if tx.send(event).is_err() {
            debug!("Bus receiver dropped, stopping MQTT poller");
            break;
        }
    }
}

#[async_trait]
impl Bus for MqttBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> AdapterResult<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| AdapterError::Communication(format!("publish {}: {}", topic, e)))
    }

    async fn subscribe(&self, filter: &str) -> AdapterResult<()> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| AdapterError::Communication(format!("subscribe {}: {}", filter, e)))
    }
}
