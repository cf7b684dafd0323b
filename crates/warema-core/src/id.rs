//! Canonical device identifiers.
//!
//! The stick, the scan results and MQTT topics all spell serial numbers
//! differently (`"00969444"`, `969444`, `"SNR-969444"`). Everything is folded
//! into a [`DeviceId`] before it is used as a key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical numeric serial number of a WMS device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Wrap an already canonical value. Zero is not a valid serial number.
    pub fn new(value: u64) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a raw identifier into a [`DeviceId`].
///
/// Every non-digit character is stripped and the remaining digits are parsed
/// base 10. No digits, a zero value or a value that does not fit in `u64`
/// yields `None`.
pub fn normalize(raw: &str) -> Option<DeviceId> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok().and_then(DeviceId::new)
}
