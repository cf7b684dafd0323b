//! Home Assistant MQTT Discovery for WMS covers.
//!
//! Every coverable device gets one retained config message:
//!
//! ```json
//! // Topic: homeassistant/cover/969444/969444/config
//! {
//!   "availability": [
//!     {"topic": "warema/bridge/state"},
//!     {"topic": "warema/969444/availability"}
//!   ],
//!   "unique_id": "969444",
//!   "has_entity_name": true,
//!   "device": {
//!     "identifiers": "969444",
//!     "manufacturer": "Warema",
//!     "name": "Kitchen",
//!     "model": "Radio motor (cover)"
//!   },
//!   "position_open": 0,
//!   "position_closed": 100,
//!   "command_topic": "warema/969444/set",
//!   "position_topic": "warema/969444/position",
//!   "set_position_topic": "warema/969444/set_position"
//! }
//! ```
//!
//! Weather stations are announced separately by [`crate::weather`].

use serde::Serialize;
use tracing::{debug, warn};

use warema_core::DeviceId;

use crate::adapter::{AdapterError, AdapterResult};
use crate::bus::Bus;
use crate::registry::DeviceRecord;
use crate::topics::Topics;

pub const MANUFACTURER: &str = "Warema";

const TILT_MIN: i64 = -100;
const TILT_MAX: i64 = 100;

/// WMS device class, from the stick's numeric type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// 6
    WeatherStation,
    /// 9, WebControl Pro
    RemoteHub,
    /// 20
    PlugReceiver,
    /// 21, awning-style
    Actuator,
    /// 25, roller or blind
    RadioMotor,
    Unsupported(i64),
}

impl DeviceClass {
    pub fn from_code(code: i64) -> Self {
        match code {
            6 => Self::WeatherStation,
            9 => Self::RemoteHub,
            20 => Self::PlugReceiver,
            21 => Self::Actuator,
            25 => Self::RadioMotor,
            other => Self::Unsupported(other),
        }
    }

    /// Model string shown in Home Assistant; `None` for classes without a cover.
    pub fn cover_model(&self) -> Option<&'static str> {
        match self {
            Self::PlugReceiver => Some("Plug receiver"),
            Self::Actuator => Some("Actuator UP"),
            Self::RadioMotor => Some("Radio motor (cover)"),
            _ => None,
        }
    }

    /// `(closed, opened)` tilt values, for classes with a tilt axis.
    pub fn tilt_values(&self) -> Option<(i64, i64)> {
        match self {
            Self::PlugReceiver => Some((100, -100)),
            Self::Actuator => Some((-100, 100)),
            _ => None,
        }
    }
}

/// Entry of a discovery `availability` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityRef {
    pub topic: String,
}

/// Bridge-wide and per-device liveness topics.
pub fn availability_for(topics: &Topics, id: DeviceId) -> Vec<AvailabilityRef> {
    vec![
        AvailabilityRef {
            topic: topics.bridge_state(),
        },
        AvailabilityRef {
            topic: topics.availability(id),
        },
    ]
}

/// Device block of a discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Single identifier, the decimal id
    pub identifiers: String,
    pub manufacturer: String,
    pub name: String,
    pub model: String,
}

/// Tilt part of a cover descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TiltConfig {
    pub tilt_status_topic: String,
    pub tilt_command_topic: String,
    pub tilt_closed_value: i64,
    pub tilt_opened_value: i64,
    pub tilt_min: i64,
    pub tilt_max: i64,
}

/// Cover discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverDescriptor {
    pub availability: Vec<AvailabilityRef>,
    pub unique_id: String,
    pub has_entity_name: bool,
    pub device: DeviceInfo,
    pub position_open: i64,
    pub position_closed: i64,
    pub command_topic: String,
    pub position_topic: String,
    pub set_position_topic: String,
    #[serde(flatten)]
    pub tilt: Option<TiltConfig>,
}

/// Renders and delivers cover descriptors.
#[derive(Debug, Clone)]
pub struct DiscoveryPublisher {
    topics: Topics,
}

impl DiscoveryPublisher {
    pub fn new(topics: Topics) -> Self {
        Self { topics }
    }

    /// Config topic and descriptor for a record, or `None` when its class has
    /// no cover entity.
    pub fn descriptor_for(&self, record: &DeviceRecord) -> Option<(String, CoverDescriptor)> {
        let class = DeviceClass::from_code(record.device_type);
        let model = class.cover_model()?;
        let id = record.id;
        let topics = &self.topics;

        let tilt = class.tilt_values().map(|(closed, opened)| TiltConfig {
            tilt_status_topic: topics.tilt(id),
            tilt_command_topic: topics.set_tilt(id),
            tilt_closed_value: closed,
            tilt_opened_value: opened,
            tilt_min: TILT_MIN,
            tilt_max: TILT_MAX,
        });

        let descriptor = CoverDescriptor {
            availability: availability_for(topics, id),
            unique_id: id.to_string(),
            has_entity_name: true,
            device: DeviceInfo {
                identifiers: id.to_string(),
                manufacturer: MANUFACTURER.to_string(),
                name: record.name.clone(),
                model: model.to_string(),
            },
            position_open: 0,
            position_closed: 100,
            command_topic: topics.command(id),
            position_topic: topics.position(id),
            set_position_topic: topics.set_position(id),
            tilt,
        };

        Some((topics.cover_config(id), descriptor))
    }

    /// Publish the retained descriptor for `record`.
    ///
    /// Returns `Ok(false)` when the class has no descriptor.
    pub async fn publish(&self, bus: &dyn Bus, record: &DeviceRecord) -> AdapterResult<bool> {
        let Some((topic, descriptor)) = self.descriptor_for(record) else {
            match DeviceClass::from_code(record.device_type) {
                DeviceClass::Unsupported(code) => {
                    warn!(
                        device = %record.id,
                        device_type = code,
                        "Unsupported device type, skipping discovery"
                    );
                }
                class => {
                    debug!(device = %record.id, ?class, "No cover descriptor for device class");
                }
            }
            return Ok(false);
        };

        let payload =
            serde_json::to_vec(&descriptor).map_err(|e| AdapterError::Other(e.into()))?;
        bus.publish(&topic, payload, true).await?;
        debug!(device = %record.id, topic = %topic, "Published cover discovery");
        Ok(true)
    }
}
