//! Recording collaborators for driving a `Bridge` in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use warema_core::{BridgeConfig, DeviceId};
use warema_devices::{AdapterError, AdapterResult, Bridge, Bus, Gateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl Published {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.payload).expect("payload is JSON")
    }
}

#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<String>>,
}

impl RecordingBus {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }

    pub fn on_topic(&self, topic: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .collect()
    }

    pub fn matching(&self, predicate: impl Fn(&str) -> bool) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| predicate(&p.topic))
            .collect()
    }

    pub fn cover_configs(&self) -> Vec<Published> {
        self.matching(|t| t.starts_with("homeassistant/cover/") && t.ends_with("/config"))
    }

    pub fn sensor_configs(&self) -> Vec<Published> {
        self.matching(|t| t.starts_with("homeassistant/sensor/") && t.ends_with("/config"))
    }
}

#[async_trait]
impl Bus for RecordingBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> AdapterResult<()> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8(payload).expect("utf-8 payload"),
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> AdapterResult<()> {
        self.subscriptions.lock().unwrap().push(filter.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    RegisterDevice(u64, String),
    SetPosition(u64, i64, i64),
    Stop(u64),
    PollingInterval(Duration),
    MovingInterval(Duration),
    ScanDevices(bool),
}

#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    failing: bool,
}

impl RecordingGateway {
    /// A gateway that records every call and then fails it.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: GatewayCall) -> AdapterResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing {
            Err(AdapterError::Communication("stick unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn register_device(&self, id: DeviceId, name: &str) -> AdapterResult<()> {
        self.record(GatewayCall::RegisterDevice(id.get(), name.to_string()))
    }

    async fn set_position(&self, id: DeviceId, position: i64, tilt: i64) -> AdapterResult<()> {
        self.record(GatewayCall::SetPosition(id.get(), position, tilt))
    }

    async fn stop(&self, id: DeviceId) -> AdapterResult<()> {
        self.record(GatewayCall::Stop(id.get()))
    }

    async fn set_polling_interval(&self, interval: Duration) -> AdapterResult<()> {
        self.record(GatewayCall::PollingInterval(interval))
    }

    async fn set_moving_interval(&self, interval: Duration) -> AdapterResult<()> {
        self.record(GatewayCall::MovingInterval(interval))
    }

    async fn scan_devices(&self, auto_assign: bool) -> AdapterResult<()> {
        self.record(GatewayCall::ScanDevices(auto_assign))
    }
}

pub struct Harness {
    pub bridge: Bridge,
    pub bus: Arc<RecordingBus>,
    pub gateway: Arc<RecordingGateway>,
}

impl Harness {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_gateway(config, RecordingGateway::default())
    }

    pub fn with_gateway(config: BridgeConfig, gateway: RecordingGateway) -> Self {
        let bus = Arc::new(RecordingBus::default());
        let gateway = Arc::new(gateway);
        let bridge = Bridge::new(config, gateway.clone(), bus.clone());
        Self {
            bridge,
            bus,
            gateway,
        }
    }

    pub fn clear(&self) {
        self.bus.clear();
        self.gateway.clear();
    }
}

pub fn id(value: u64) -> DeviceId {
    DeviceId::new(value).expect("non-zero id")
}
