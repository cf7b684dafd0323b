//! MQTT topic layout.
//!
//! Outbound topics are built here and inbound topics are parsed here, so no
//! other module splits topic strings.
//!
//! ```text
//! warema/bridge/state                         bridge liveness (retained, LWT)
//! warema/<id>/availability                    device liveness (retained)
//! warema/<id>/position | tilt                 cover state
//! warema/<id>/<kind>/state                    weather sensor state
//! warema/<id>/set | set_position | set_tilt   commands from Home Assistant
//! homeassistant/cover/<id>/<id>/config        cover discovery
//! homeassistant/sensor/<id>/<kind>/config     weather sensor discovery
//! homeassistant/status                        Home Assistant birth/will
//! ```

use warema_core::{normalize, BridgeConfig, DeviceId};

use crate::weather::WeatherKind;

/// Payload Home Assistant sends on its status topic after a (re)start.
pub const PLATFORM_ONLINE: &str = "online";
pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

/// Kind of an inbound device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// `OPEN` / `CLOSE` / `STOP`
    Set,
    /// Target position
    SetPosition,
    /// Target tilt
    SetTilt,
    /// Any other segment, including the bridge's own state topics
    Other(String),
}

impl CommandKind {
    fn from_segment(segment: &str) -> Self {
        match segment {
            "set" => Self::Set,
            "set_position" => Self::SetPosition,
            "set_tilt" => Self::SetTilt,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this kind results in a gateway call.
    pub fn is_control(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// A device-addressed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: DeviceId,
    pub kind: CommandKind,
    pub payload: String,
}

/// Classified inbound MQTT message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Home Assistant status; `online` after a restart.
    PlatformStatus { online: bool },
    Command(Command),
    /// Outside the namespace, or missing/invalid id or command segment.
    Unaddressed,
}

/// Topic builder and parser for one namespace / discovery prefix pair.
#[derive(Debug, Clone)]
pub struct Topics {
    namespace: String,
    discovery_prefix: String,
}

impl Topics {
    pub fn new(namespace: impl Into<String>, discovery_prefix: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            discovery_prefix: discovery_prefix.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.namespace, &config.discovery_prefix)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn bridge_state(&self) -> String {
        format!("{}/bridge/state", self.namespace)
    }

    pub fn availability(&self, id: DeviceId) -> String {
        format!("{}/{}/availability", self.namespace, id)
    }

    pub fn position(&self, id: DeviceId) -> String {
        format!("{}/{}/position", self.namespace, id)
    }

    pub fn tilt(&self, id: DeviceId) -> String {
        format!("{}/{}/tilt", self.namespace, id)
    }

    pub fn command(&self, id: DeviceId) -> String {
        format!("{}/{}/set", self.namespace, id)
    }

    pub fn set_position(&self, id: DeviceId) -> String {
        format!("{}/{}/set_position", self.namespace, id)
    }

    pub fn set_tilt(&self, id: DeviceId) -> String {
        format!("{}/{}/set_tilt", self.namespace, id)
    }

    pub fn sensor_state(&self, id: DeviceId, kind: WeatherKind) -> String {
        format!("{}/{}/{}/state", self.namespace, id, kind.as_str())
    }

    pub fn cover_config(&self, id: DeviceId) -> String {
        format!("{}/cover/{}/{}/config", self.discovery_prefix, id, id)
    }

    pub fn sensor_config(&self, id: DeviceId, kind: WeatherKind) -> String {
        format!(
            "{}/sensor/{}/{}/config",
            self.discovery_prefix,
            id,
            kind.as_str()
        )
    }

    pub fn platform_status(&self) -> String {
        format!("{}/status", self.discovery_prefix)
    }

    /// Subscription filters needed on every (re)connect.
    pub fn subscriptions(&self) -> Vec<String> {
        vec![format!("{}/#", self.namespace), self.platform_status()]
    }

    /// Classify an inbound message.
    pub fn parse_inbound(&self, topic: &str, payload: &[u8]) -> Inbound {
        let payload = String::from_utf8_lossy(payload);

        if topic == self.platform_status() {
            return Inbound::PlatformStatus {
                online: payload.trim() == PLATFORM_ONLINE,
            };
        }

        let mut parts = topic.split('/');
        if parts.next() != Some(self.namespace.as_str()) {
            return Inbound::Unaddressed;
        }
        let (Some(raw_id), Some(segment)) = (parts.next(), parts.next()) else {
            return Inbound::Unaddressed;
        };
        if segment.is_empty() {
            return Inbound::Unaddressed;
        }
        let Some(id) = normalize(raw_id) else {
            return Inbound::Unaddressed;
        };

        Inbound::Command(Command {
            id,
            kind: CommandKind::from_segment(segment),
            payload: payload.into_owned(),
        })
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> DeviceId {
        DeviceId::new(v).unwrap()
    }

    #[test]
    fn test_outbound_topics() {
        let topics = Topics::default();
        let dev = id(969444);

        assert_eq!(topics.bridge_state(), "warema/bridge/state");
        assert_eq!(topics.availability(dev), "warema/969444/availability");
        assert_eq!(topics.position(dev), "warema/969444/position");
        assert_eq!(topics.tilt(dev), "warema/969444/tilt");
        assert_eq!(topics.command(dev), "warema/969444/set");
        assert_eq!(topics.set_position(dev), "warema/969444/set_position");
        assert_eq!(topics.set_tilt(dev), "warema/969444/set_tilt");
        assert_eq!(
            topics.sensor_state(dev, WeatherKind::Wind),
            "warema/969444/wind/state"
        );
        assert_eq!(
            topics.cover_config(dev),
            "homeassistant/cover/969444/969444/config"
        );
        assert_eq!(
            topics.sensor_config(dev, WeatherKind::Illuminance),
            "homeassistant/sensor/969444/illuminance/config"
        );
        assert_eq!(
            topics.subscriptions(),
            vec!["warema/#".to_string(), "homeassistant/status".to_string()]
        );
    }

    #[test]
    fn test_parse_commands() {
        let topics = Topics::default();

        assert_eq!(
            topics.parse_inbound("warema/00969444/set", b"CLOSE"),
            Inbound::Command(Command {
                id: id(969444),
                kind: CommandKind::Set,
                payload: "CLOSE".to_string(),
            })
        );
        assert_eq!(
            topics.parse_inbound("warema/12/set_tilt", b"-50"),
            Inbound::Command(Command {
                id: id(12),
                kind: CommandKind::SetTilt,
                payload: "-50".to_string(),
            })
        );
        assert_eq!(
            topics.parse_inbound("warema/12/illuminance/state", b"300"),
            Inbound::Command(Command {
                id: id(12),
                kind: CommandKind::Other("illuminance".to_string()),
                payload: "300".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_unaddressed() {
        let topics = Topics::default();

        assert_eq!(topics.parse_inbound("warema/bridge/state", b"online"), Inbound::Unaddressed);
        assert_eq!(topics.parse_inbound("warema/12345", b""), Inbound::Unaddressed);
        assert_eq!(topics.parse_inbound("warema/12345/", b""), Inbound::Unaddressed);
        assert_eq!(topics.parse_inbound("other/12345/set", b"OPEN"), Inbound::Unaddressed);
        assert_eq!(topics.parse_inbound("homeassistant/cover/1/1/config", b"{}"), Inbound::Unaddressed);
    }

    #[test]
    fn test_parse_platform_status() {
        let topics = Topics::default();

        assert_eq!(
            topics.parse_inbound("homeassistant/status", b"online"),
            Inbound::PlatformStatus { online: true }
        );
        assert_eq!(
            topics.parse_inbound("homeassistant/status", b"offline"),
            Inbound::PlatformStatus { online: false }
        );
    }

    #[test]
    fn test_custom_namespace() {
        let topics = Topics::new("blinds", "ha");
        assert_eq!(topics.bridge_state(), "blinds/bridge/state");
        assert_eq!(topics.platform_status(), "ha/status");
        assert!(matches!(
            topics.parse_inbound("blinds/7/set", b"STOP"),
            Inbound::Command(_)
        ));
        assert_eq!(topics.parse_inbound("warema/7/set", b"STOP"), Inbound::Unaddressed);
    }
}
