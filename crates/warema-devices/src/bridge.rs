//! Bridge context.
//!
//! [`Bridge`] owns the device registry, the position cache and the set of
//! announced weather stations, plus handles to the gateway and the bus. All
//! handlers take `&mut self` and run one at a time; the gateway event
//! dispatcher lives in [`crate::dispatcher`] and the command translator in
//! [`crate::commands`].

use std::sync::Arc;
use tracing::{debug, info, warn};

use warema_core::{BridgeConfig, DeviceId};

use crate::bus::Bus;
use crate::discovery::DiscoveryPublisher;
use crate::gateway::Gateway;
use crate::position::PositionCache;
use crate::registry::{DeviceRegistry, RegisterOutcome};
use crate::topics::{Topics, ONLINE};
use crate::weather::WeatherAnnouncer;

pub struct Bridge {
    pub(crate) config: BridgeConfig,
    pub(crate) topics: Topics,
    pub(crate) registry: DeviceRegistry,
    pub(crate) positions: PositionCache,
    pub(crate) discovery: DiscoveryPublisher,
    pub(crate) weather: WeatherAnnouncer,
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) bus: Arc<dyn Bus>,
}

impl Bridge {
    pub fn new(config: BridgeConfig, gateway: Arc<dyn Gateway>, bus: Arc<dyn Bus>) -> Self {
        let topics = Topics::from_config(&config);
        Self {
            registry: DeviceRegistry::new(config.ignored.clone()),
            positions: PositionCache::new(),
            discovery: DiscoveryPublisher::new(topics.clone()),
            weather: WeatherAnnouncer::new(topics.clone()),
            topics,
            config,
            gateway,
            bus,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn positions(&self) -> &PositionCache {
        &self.positions
    }

    pub fn weather(&self) -> &WeatherAnnouncer {
        &self.weather
    }

    /// Register a device and, when accepted, run the registration protocol:
    /// tell the gateway, publish discovery, mark the device available.
    ///
    /// Collaborator failures are logged; later steps still run and the
    /// registry entry stays.
    pub async fn register(&mut self, raw_id: &str, name: &str, raw_type: &str) -> RegisterOutcome {
        let outcome = self.registry.register(raw_id, name, raw_type);

        match &outcome {
            RegisterOutcome::Accepted(record) => {
                info!(
                    device = %record.id,
                    name = %record.name,
                    device_type = record.device_type,
                    "Registered device"
                );

                if let Err(e) = self.gateway.register_device(record.id, &record.name).await {
                    warn!(device = %record.id, "Gateway rejected device registration: {}", e);
                }
                if let Err(e) = self.discovery.publish(self.bus.as_ref(), record).await {
                    warn!(device = %record.id, "Failed to publish discovery: {}", e);
                }
                self.publish(&self.topics.availability(record.id), ONLINE, true)
                    .await;
            }
            RegisterOutcome::Ignored(id) => {
                debug!(device = %id, "Ignoring configured device");
            }
            RegisterOutcome::Rejected(reason) => {
                debug!(?reason, "Rejected device registration");
            }
        }

        outcome
    }

    /// Register `id` as `default_type` unless it is already known.
    ///
    /// Returns `false` when the device is ignored and must not be acted on.
    pub async fn ensure_registered(&mut self, id: DeviceId, default_type: i64) -> bool {
        if self.registry.has(id) {
            return true;
        }
        if self.registry.is_ignored(id) {
            return false;
        }

        debug!(device = %id, default_type, "Registering unknown device");
        matches!(
            self.register(&id.to_string(), "", &default_type.to_string())
                .await,
            RegisterOutcome::Accepted(_)
        )
    }

    /// Subscribe and announce the bridge after every bus (re)connect.
    pub async fn handle_bus_connected(&self) {
        for filter in self.topics.subscriptions() {
            match self.bus.subscribe(&filter).await {
                Ok(()) => debug!("Subscribed to {}", filter),
                Err(e) => warn!("Failed to subscribe to {}: {}", filter, e),
            }
        }
        self.publish(&self.topics.bridge_state(), ONLINE, true).await;
        info!("Bridge online");
    }

    pub(crate) async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>, retain: bool) {
        if let Err(e) = self.bus.publish(topic, payload.into(), retain).await {
            warn!("Failed to publish {}: {}", topic, e);
        }
    }
}
