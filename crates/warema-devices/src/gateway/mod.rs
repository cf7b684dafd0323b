//! Stick gateway capability.
//!
//! The bridge talks to the WMS USB stick only through [`Gateway`]. The
//! [`sidecar`] implementation forwards calls to a gateway daemon that owns
//! the serial port.

use async_trait::async_trait;
use std::time::Duration;

use warema_core::DeviceId;

use crate::adapter::AdapterResult;

pub mod event;
pub mod sidecar;

pub use event::{GatewayEvent, PositionReport, RawGatewayMessage, ScannedDevice, WeatherReport};
pub use sidecar::{GatewayConfig, GatewayRequest, SidecarGateway};

/// Calls the bridge makes into the stick.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Make a device known to the stick so later control calls resolve.
    async fn register_device(&self, id: DeviceId, name: &str) -> AdapterResult<()>;

    /// Move to `position` (0..100) and `tilt` (-100..100).
    async fn set_position(&self, id: DeviceId, position: i64, tilt: i64) -> AdapterResult<()>;

    async fn stop(&self, id: DeviceId) -> AdapterResult<()>;

    async fn set_polling_interval(&self, interval: Duration) -> AdapterResult<()>;

    async fn set_moving_interval(&self, interval: Duration) -> AdapterResult<()>;

    async fn scan_devices(&self, auto_assign: bool) -> AdapterResult<()>;
}
