//! Last reported position and tilt per device.
//!
//! The stick only accepts position and tilt together, so commands that touch
//! one axis take the other one from here.

use serde_json::Value;
use std::collections::HashMap;

use warema_core::value::parse_int_value;
use warema_core::DeviceId;

/// Position (0 open .. 100 closed) and tilt (-100 .. 100) of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionRecord {
    pub position: i64,
    pub tilt: i64,
}

/// Position cache. Entries live for the whole process.
#[derive(Debug, Default)]
pub struct PositionCache {
    positions: HashMap<DeviceId, PositionRecord>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reported position; an unparsable axis is stored as 0.
    pub fn update(&mut self, id: DeviceId, position: &Value, tilt: &Value) -> PositionRecord {
        let record = PositionRecord {
            position: parse_int_value(position).unwrap_or(0),
            tilt: parse_int_value(tilt).unwrap_or(0),
        };
        self.positions.insert(id, record);
        record
    }

    /// Cached position, or `(0, 0)` for a device that never reported.
    pub fn read(&self, id: DeviceId) -> PositionRecord {
        self.positions.get(&id).copied().unwrap_or_default()
    }
}
