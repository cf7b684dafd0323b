//! Core types for the Warema WMS bridge.
//!
//! This crate holds the pieces every other crate leans on: the canonical
//! device identifier, lenient value parsing for untrusted gateway data, the
//! shared error type and the bridge configuration.

pub mod config;
pub mod error;
pub mod id;
pub mod value;

pub use config::{BridgeConfig, ForcedDevice, IgnoreSet};
pub use error::{Error, Result};
pub use id::{normalize, DeviceId};

