//! Warema WMS device management and protocol translation.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `mqtt` | ✅ | rumqttc-backed [`bus::mqtt::MqttBus`] |
//!
//! ## Architecture
//!
//! - **DeviceRegistry**: canonical id -> device record, with ignore filtering
//! - **PositionCache**: last reported position/tilt per device
//! - **DiscoveryPublisher** / **WeatherAnnouncer**: Home Assistant discovery
//! - **Bridge**: owns the state above and the two collaborators, and runs the
//!   gateway event dispatcher and the MQTT command translator
//! - **Gateway** / **Bus**: capability traits for the stick driver and the
//!   MQTT client

pub mod adapter;
pub mod bridge;
pub mod bus;
pub mod commands;
pub mod discovery;
pub mod dispatcher;
pub mod gateway;
pub mod position;
pub mod registry;
pub mod topics;
pub mod weather;

pub use adapter::{AdapterError, AdapterResult};
pub use bridge::Bridge;
pub use bus::{Bus, BusEvent};
pub use discovery::{CoverDescriptor, DeviceClass, DiscoveryPublisher};
pub use gateway::{Gateway, GatewayEvent};
pub use position::{PositionCache, PositionRecord};
pub use registry::{DeviceRecord, DeviceRegistry, RegisterOutcome, RejectReason};
pub use topics::{Command, CommandKind, Inbound, Topics};
pub use weather::{SensorDescriptor, WeatherAnnouncer, WeatherKind};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
