//! Gateway event dispatcher.

use tracing::{debug, info, warn};

use warema_core::config::defaults;
use warema_core::value::coerce_to_string;
use warema_core::{normalize, DeviceId};

use crate::bridge::Bridge;
use crate::gateway::{GatewayEvent, PositionReport, ScannedDevice, WeatherReport};
use crate::weather::WeatherKind;

impl Bridge {
    /// React to one gateway event. Never fails; problems are logged and the
    /// event is skipped.
    pub async fn handle_gateway_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::InitCompletion => self.on_init_completion().await,
            GatewayEvent::ScannedDevices(devices) => self.on_scanned_devices(devices).await,
            GatewayEvent::WeatherBroadcast(report) => self.on_weather_broadcast(report).await,
            GatewayEvent::PositionUpdate(report) => self.on_position_update(report).await,
            GatewayEvent::SetPositionResult(result) => {
                debug!(%result, "Set position result");
            }
            GatewayEvent::StopResult(result) => {
                debug!(%result, "Stop result");
            }
            GatewayEvent::Unknown(topic) => {
                debug!(topic = %topic, "Dropping unhandled gateway event");
            }
        }
    }

    async fn on_init_completion(&mut self) {
        info!("Gateway initialization completed");

        let polling = self.config.polling_interval;
        let moving = self.config.moving_interval;
        match self.gateway.set_polling_interval(polling).await {
            Ok(()) => info!("Position update interval set to {}s", polling.as_secs()),
            Err(e) => warn!("Failed to set position update interval: {}", e),
        }
        if let Err(e) = self.gateway.set_moving_interval(moving).await {
            warn!("Failed to set moving blinds interval: {}", e);
        }

        if self.config.forced.is_empty() {
            info!("Scanning for devices");
            if let Err(e) = self.gateway.scan_devices(false).await {
                warn!("Device scan failed: {}", e);
            }
            return;
        }

        let forced = self.config.forced.clone();
        info!("Registering {} configured devices", forced.len());
        for device in forced {
            self.register(&device.id.to_string(), "", &device.device_type.to_string())
                .await;
        }
    }

    async fn on_scanned_devices(&mut self, devices: Vec<ScannedDevice>) {
        debug!("Scan returned {} devices", devices.len());
        for device in devices {
            // the stick keeps the serial as reported, leading zeros included
            let raw_id = coerce_to_string(&device.snr);
            let raw_type = coerce_to_string(&device.device_type);
            self.register(&raw_id, &raw_id, &raw_type).await;
        }
    }

    async fn on_weather_broadcast(&mut self, report: WeatherReport) {
        let Some(id) = self.accept_reported_id(&report.snr) else {
            return;
        };

        if let Err(e) = self.weather.announce(self.bus.as_ref(), id).await {
            warn!(device = %id, "Failed to announce weather station: {}", e);
        }

        let readings = [
            (WeatherKind::Illuminance, &report.lumen),
            (WeatherKind::Temperature, &report.temp),
            (WeatherKind::Wind, &report.wind),
            (WeatherKind::Rain, &report.rain),
        ];
        for (kind, value) in readings {
            self.publish(
                &self.topics.sensor_state(id, kind),
                coerce_to_string(value),
                false,
            )
            .await;
        }
    }

    async fn on_position_update(&mut self, report: PositionReport) {
        let Some(id) = self.accept_reported_id(&report.snr) else {
            return;
        };

        if !self.ensure_registered(id, defaults::DEVICE_TYPE).await {
            return;
        }

        let record = self.positions.update(id, &report.position, &report.angle);
        debug!(device = %id, position = record.position, tilt = record.tilt, "Position update");

        self.publish(&self.topics.position(id), record.position.to_string(), false)
            .await;
        self.publish(&self.topics.tilt(id), record.tilt.to_string(), false)
            .await;
    }

    /// Normalized id of a reporting device, unless invalid or ignored.
    fn accept_reported_id(&self, snr: &serde_json::Value) -> Option<DeviceId> {
        let Some(id) = normalize(&coerce_to_string(snr)) else {
            debug!(%snr, "Dropping gateway event with invalid id");
            return None;
        };
        if self.registry.is_ignored(id) {
            debug!(device = %id, "Dropping gateway event for ignored device");
            return None;
        }
        Some(id)
    }
}
