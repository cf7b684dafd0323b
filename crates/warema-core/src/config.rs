//! Bridge configuration: defaults, environment variable names and the
//! parsers that turn raw environment strings into typed settings.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::warn;

use crate::config_err;
use crate::error::{Error, Result};
use crate::id::{normalize, DeviceId};
use crate::value::parse_int;

/// Default values.
pub mod defaults {
    /// Topic namespace for device state and commands.
    pub const NAMESPACE: &str = "warema";
    /// Home Assistant discovery prefix.
    pub const DISCOVERY_PREFIX: &str = "homeassistant";
    /// Position polling interval in milliseconds.
    pub const POLLING_INTERVAL_MS: u64 = 30_000;
    /// Moving-blind watch interval in milliseconds.
    pub const MOVING_INTERVAL_MS: u64 = 1_000;
    /// Device type assumed for forced entries without a type and for devices
    /// that show up before they were scanned.
    pub const DEVICE_TYPE: i64 = 25;

    pub const MQTT_SERVER: &str = "mqtt://localhost:1883";
    pub const GATEWAY_ADDR: &str = "127.0.0.1:9760";
    pub const SERIAL_PORT: &str = "/dev/ttyUSB0";
    pub const CHANNEL: u8 = 17;
    pub const PAN_ID: &str = "FFFF";
    pub const KEY: &str = "00112233445566778899AABBCCDDEEFF";
}

/// Environment variable names.
pub mod env_vars {
    pub const GATEWAY_ADDR: &str = "WMS_GATEWAY_ADDR";
    pub const SERIAL_PORT: &str = "WMS_SERIAL_PORT";
    pub const CHANNEL: &str = "WMS_CHANNEL";
    pub const PAN_ID: &str = "WMS_PAN_ID";
    pub const KEY: &str = "WMS_KEY";
    pub const MQTT_SERVER: &str = "MQTT_SERVER";
    pub const MQTT_USER: &str = "MQTT_USER";
    pub const MQTT_PASSWORD: &str = "MQTT_PASSWORD";
    pub const MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
    pub const POLLING_INTERVAL: &str = "POLLING_INTERVAL";
    pub const MOVING_INTERVAL: &str = "MOVING_INTERVAL";
    pub const IGNORED_DEVICES: &str = "IGNORED_DEVICES";
    pub const FORCE_DEVICES: &str = "FORCE_DEVICES";
    pub const NAMESPACE: &str = "WAREMA_NAMESPACE";
    pub const DISCOVERY_PREFIX: &str = "HASS_DISCOVERY_PREFIX";
    pub const LOG_JSON: &str = "WAREMA_LOG_JSON";
}

/// Set of device ids excluded from registration and publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet(BTreeSet<DeviceId>);

impl IgnoreSet {
    pub fn new(ids: impl IntoIterator<Item = DeviceId>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A device declared by configuration instead of being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedDevice {
    pub id: DeviceId,
    pub device_type: i64,
}

/// Settings consumed by the translation core.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Topic namespace for device state and commands (`warema`).
    pub namespace: String,
    /// Home Assistant discovery prefix (`homeassistant`).
    pub discovery_prefix: String,
    pub ignored: IgnoreSet,
    /// When non-empty, replaces scanning.
    pub forced: Vec<ForcedDevice>,
    pub polling_interval: Duration,
    pub moving_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::NAMESPACE.to_string(),
            discovery_prefix: defaults::DISCOVERY_PREFIX.to_string(),
            ignored: IgnoreSet::default(),
            forced: Vec::new(),
            polling_interval: Duration::from_millis(defaults::POLLING_INTERVAL_MS),
            moving_interval: Duration::from_millis(defaults::MOVING_INTERVAL_MS),
        }
    }
}

impl BridgeConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_discovery_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.discovery_prefix = prefix.into();
        self
    }

    pub fn with_ignored(mut self, ignored: IgnoreSet) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_forced(mut self, forced: Vec<ForcedDevice>) -> Self {
        self.forced = forced;
        self
    }

    pub fn with_intervals(mut self, polling: Duration, moving: Duration) -> Self {
        self.polling_interval = polling;
        self.moving_interval = moving;
        self
    }

    /// Check that the namespace and discovery prefix are usable as topic
    /// prefixes. The namespace must be a single topic level.
    pub fn validate(&self) -> Result<()> {
        check_topic_prefix("namespace", &self.namespace)?;
        check_topic_prefix("discovery prefix", &self.discovery_prefix)?;
        if self.namespace.contains('/') {
            return Err(Error::validation(format!(
                "namespace '{}' must be a single topic level",
                self.namespace
            )));
        }
        Ok(())
    }
}

fn check_topic_prefix(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(config_err!("{} must not be empty", what));
    }
    if value.contains(['+', '#']) || value.starts_with('/') || value.ends_with('/') {
        return Err(Error::validation(format!(
            "{} '{}' is not a valid topic prefix",
            what, value
        )));
    }
    Ok(())
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `IGNORED_DEVICES`. Entries are normalized like any other id.
pub fn parse_ignored(raw: &str) -> IgnoreSet {
    let ids = parse_list(raw).into_iter().filter_map(|entry| {
        let id = normalize(&entry);
        if id.is_none() {
            warn!("Ignoring invalid entry in ignore list: {}", entry);
        }
        id
    });
    IgnoreSet::new(ids)
}

/// Parse `FORCE_DEVICES`: `id[:type]` entries, type defaults to 25.
pub fn parse_forced(raw: &str) -> Vec<ForcedDevice> {
    parse_list(raw)
        .into_iter()
        .filter_map(|entry| {
            let (id_part, type_part) = match entry.split_once(':') {
                Some((id, ty)) => (id.trim(), ty.trim()),
                None => (entry.as_str(), ""),
            };
            let Some(id) = normalize(id_part) else {
                warn!("Skipping forced device with invalid id: {}", entry);
                return None;
            };
            let device_type = parse_int(type_part).unwrap_or(defaults::DEVICE_TYPE);
            Some(ForcedDevice { id, device_type })
        })
        .collect()
}

/// Parse an interval in milliseconds; unparsable or negative values fall back
/// to `default_ms`.
pub fn parse_interval(raw: Option<&str>, default_ms: u64) -> Duration {
    let ms = raw
        .and_then(parse_int)
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}
