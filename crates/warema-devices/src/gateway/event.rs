//! Events pushed by the stick.
//!
//! The gateway reports `{topic, payload}` messages named after the
//! warema-wms-api callbacks. Payload fields are kept as raw JSON values since
//! the stick is loose about numbers versus strings; the bridge normalizes them.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const INIT_COMPLETION: &str = "wms-vb-init-completion";
pub const SCANNED_DEVICES: &str = "wms-vb-scanned-devices";
pub const WEATHER_BROADCAST: &str = "wms-vb-rcv-weather-broadcast";
pub const POSITION_UPDATE: &str = "wms-vb-blind-position-update";
pub const SET_POSITION_RESULT: &str = "wms-vb-cmd-result-set-position";
pub const STOP_RESULT: &str = "wms-vb-cmd-result-stop";

/// Message as it arrives from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGatewayMessage {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

/// One entry of a scan result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScannedDevice {
    #[serde(default)]
    pub snr: Value,
    #[serde(default, rename = "type")]
    pub device_type: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ScanPayload {
    #[serde(default)]
    devices: Vec<ScannedDevice>,
}

/// Values of a weather broadcast; absent fields are `Null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub snr: Value,
    #[serde(default)]
    pub lumen: Value,
    #[serde(default)]
    pub temp: Value,
    #[serde(default)]
    pub wind: Value,
    #[serde(default)]
    pub rain: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct WeatherPayload {
    weather: WeatherReport,
}

/// Position report of a blind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PositionReport {
    #[serde(default)]
    pub snr: Value,
    #[serde(default)]
    pub position: Value,
    #[serde(default)]
    pub angle: Value,
}

/// Classified gateway event.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    InitCompletion,
    ScannedDevices(Vec<ScannedDevice>),
    WeatherBroadcast(WeatherReport),
    PositionUpdate(PositionReport),
    SetPositionResult(Value),
    StopResult(Value),
    /// Unrecognized topic or malformed payload
    Unknown(String),
}

impl GatewayEvent {
    /// Classify a raw message. A payload that does not fit its topic
    /// becomes `Unknown`.
    pub fn from_raw(raw: RawGatewayMessage) -> Self {
        let RawGatewayMessage { topic, payload } = raw;

        let decoded = match topic.as_str() {
            INIT_COMPLETION => Ok(Self::InitCompletion),
            SCANNED_DEVICES => serde_json::from_value::<ScanPayload>(payload)
                .map(|p| Self::ScannedDevices(p.devices)),
            WEATHER_BROADCAST => serde_json::from_value::<WeatherPayload>(payload)
                .map(|p| Self::WeatherBroadcast(p.weather)),
            POSITION_UPDATE => {
                serde_json::from_value::<PositionReport>(payload).map(Self::PositionUpdate)
            }
            SET_POSITION_RESULT => Ok(Self::SetPositionResult(payload)),
            STOP_RESULT => Ok(Self::StopResult(payload)),
            _ => Ok(Self::Unknown(topic.clone())),
        };

        decoded.unwrap_or_else(|e| {
            debug!(topic = %topic, "Malformed gateway payload: {}", e);
            Self::Unknown(topic)
        })
    }

    /// Decode one JSON line from the gateway daemon.
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawGatewayMessage>(line).map(Self::from_raw)
    }

    /// Stick topic name, for logging.
    pub fn topic(&self) -> &str {
        match self {
            Self::InitCompletion => INIT_COMPLETION,
            Self::ScannedDevices(_) => SCANNED_DEVICES,
            Self::WeatherBroadcast(_) => WEATHER_BROADCAST,
            Self::PositionUpdate(_) => POSITION_UPDATE,
            Self::SetPositionResult(_) => SET_POSITION_RESULT,
            Self::StopResult(_) => STOP_RESULT,
            Self::Unknown(topic) => topic,
        }
    }
}
