//! Message bus capability.
//!
//! The bridge publishes and subscribes through [`Bus`]; the MQTT
//! implementation lives in [`mqtt`].

use async_trait::async_trait;

use crate::adapter::AdapterResult;

#[cfg(feature = "mqtt")]
pub mod mqtt;

/// Publish/subscribe operations the bridge needs from a broker client.
///
/// Calls only enqueue; delivery is the implementation's concern.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> AdapterResult<()>;

    async fn subscribe(&self, filter: &str) -> AdapterResult<()>;
}

/// Event surfaced by a bus transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Connection (re)established; subscriptions must be redone.
    Connected,
    Message { topic: String, payload: Vec<u8> },
}
