//! Weather station sensors.
//!
//! A weather station only becomes visible through its broadcasts. The first
//! broadcast from a station announces four sensors under one device.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use warema_core::DeviceId;

use crate::adapter::{AdapterError, AdapterResult};
use crate::bus::Bus;
use crate::discovery::{availability_for, AvailabilityRef, DeviceInfo, MANUFACTURER};
use crate::topics::{Topics, ONLINE};

const WEATHER_MODEL: &str = "Weather Station";

/// Quantity reported by a weather broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherKind {
    Illuminance,
    Temperature,
    Wind,
    Rain,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 4] = [
        WeatherKind::Illuminance,
        WeatherKind::Temperature,
        WeatherKind::Wind,
        WeatherKind::Rain,
    ];

    /// Topic segment and unique id suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Illuminance => "illuminance",
            Self::Temperature => "temperature",
            Self::Wind => "wind",
            Self::Rain => "rain",
        }
    }

    pub fn device_class(&self) -> Option<&'static str> {
        match self {
            Self::Illuminance => Some("illuminance"),
            Self::Temperature => Some("temperature"),
            Self::Wind | Self::Rain => None,
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Illuminance => Some("lx"),
            Self::Temperature => Some("C"),
            Self::Wind => Some("m/s"),
            Self::Rain => None,
        }
    }
}

/// Sensor discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorDescriptor {
    pub name: String,
    pub availability: Vec<AvailabilityRef>,
    pub device: DeviceInfo,
    pub force_update: bool,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    pub unique_id: String,
}

/// Tracks announced stations and publishes their sensor descriptors.
#[derive(Debug)]
pub struct WeatherAnnouncer {
    topics: Topics,
    announced: BTreeSet<DeviceId>,
}

impl WeatherAnnouncer {
    pub fn new(topics: Topics) -> Self {
        Self {
            topics,
            announced: BTreeSet::new(),
        }
    }

    pub fn is_announced(&self, id: DeviceId) -> bool {
        self.announced.contains(&id)
    }

    /// Announced stations in ascending id order.
    pub fn announced(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.announced.iter().copied()
    }

    /// The four `(config topic, descriptor)` pairs for a station.
    pub fn descriptors_for(&self, id: DeviceId) -> Vec<(String, SensorDescriptor)> {
        let device = DeviceInfo {
            identifiers: id.to_string(),
            manufacturer: MANUFACTURER.to_string(),
            name: id.to_string(),
            model: WEATHER_MODEL.to_string(),
        };

        WeatherKind::ALL
            .iter()
            .map(|&kind| {
                let descriptor = SensorDescriptor {
                    name: id.to_string(),
                    availability: availability_for(&self.topics, id),
                    device: device.clone(),
                    force_update: true,
                    state_topic: self.topics.sensor_state(id, kind),
                    device_class: kind.device_class().map(str::to_string),
                    unit_of_measurement: kind.unit().map(str::to_string),
                    unique_id: format!("{}_{}", id, kind.as_str()),
                };
                (self.topics.sensor_config(id, kind), descriptor)
            })
            .collect()
    }

    /// Announce a station once per process lifetime.
    ///
    /// Returns `Ok(false)` if it was already announced. The station counts as
    /// announced even when publishing fails.
    pub async fn announce(&mut self, bus: &dyn Bus, id: DeviceId) -> AdapterResult<bool> {
        if !self.announced.insert(id) {
            return Ok(false);
        }
        info!(device = %id, "Announcing weather station");
        self.republish(bus, id).await?;
        Ok(true)
    }

    /// Publish the descriptors and availability again, without the set check.
    pub async fn republish(&self, bus: &dyn Bus, id: DeviceId) -> AdapterResult<()> {
        for (topic, descriptor) in self.descriptors_for(id) {
            let payload =
                serde_json::to_vec(&descriptor).map_err(|e| AdapterError::Other(e.into()))?;
            bus.publish(&topic, payload, true).await?;
        }
        bus.publish(&self.topics.availability(id), ONLINE.as_bytes().to_vec(), true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_metadata() {
        assert_eq!(WeatherKind::Illuminance.unit(), Some("lx"));
        assert_eq!(WeatherKind::Temperature.device_class(), Some("temperature"));
        assert_eq!(WeatherKind::Wind.device_class(), None);
        assert_eq!(WeatherKind::Rain.unit(), None);
    }

    #[test]
    fn test_descriptors_for_station() {
        let announcer = WeatherAnnouncer::new(Topics::default());
        let id = DeviceId::new(12345).unwrap();
        let descriptors = announcer.descriptors_for(id);

        let topics: Vec<&str> = descriptors.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            topics,
            vec![
                "homeassistant/sensor/12345/illuminance/config",
                "homeassistant/sensor/12345/temperature/config",
                "homeassistant/sensor/12345/wind/config",
                "homeassistant/sensor/12345/rain/config",
            ]
        );

        let temperature = serde_json::to_value(&descriptors[1].1).unwrap();
        assert_eq!(
            temperature,
            json!({
                "name": "12345",
                "availability": [
                    {"topic": "warema/bridge/state"},
                    {"topic": "warema/12345/availability"}
                ],
                "device": {
                    "identifiers": "12345",
                    "manufacturer": "Warema",
                    "name": "12345",
                    "model": "Weather Station"
                },
                "force_update": true,
                "state_topic": "warema/12345/temperature/state",
                "device_class": "temperature",
                "unit_of_measurement": "C",
                "unique_id": "12345_temperature"
            })
        );

        let rain = serde_json::to_value(&descriptors[3].1).unwrap();
        assert!(rain.get("device_class").is_none());
        assert!(rain.get("unit_of_measurement").is_none());
    }
}
