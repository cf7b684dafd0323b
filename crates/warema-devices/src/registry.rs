//! Device Registry - authoritative in-memory record of the devices the
//! bridge exposes.
//!
//! The registry is rebuilt from live gateway events on every run. It only
//! decides *whether* a registration is accepted; the side effects of an
//! accepted registration (telling the stick, discovery, availability) are
//! driven by [`crate::Bridge::register`].

use serde::Serialize;
use std::collections::BTreeMap;

use warema_core::value::parse_int;
use warema_core::{normalize, DeviceId, IgnoreSet};

/// A registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub name: String,
    /// WMS device class code (20, 21, 25, ...)
    pub device_type: i64,
}

/// Why a registration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    InvalidId(String),
    InvalidType(String),
}

/// Result of [`DeviceRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Record inserted or overwritten.
    Accepted(DeviceRecord),
    /// Id is on the ignore list; any previous record was removed.
    Ignored(DeviceId),
    /// Nothing changed.
    Rejected(RejectReason),
}

/// In-memory device registry keyed by canonical id.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, DeviceRecord>,
    ignored: IgnoreSet,
}

impl DeviceRegistry {
    pub fn new(ignored: IgnoreSet) -> Self {
        Self {
            devices: BTreeMap::new(),
            ignored,
        }
    }

    /// Register a device from raw gateway or configuration values.
    ///
    /// An empty name defaults to the decimal id.
    pub fn register(&mut self, raw_id: &str, name: &str, raw_type: &str) -> RegisterOutcome {
        let Some(id) = normalize(raw_id) else {
            return RegisterOutcome::Rejected(RejectReason::InvalidId(raw_id.to_string()));
        };

        if self.ignored.contains(id) {
            self.devices.remove(&id);
            return RegisterOutcome::Ignored(id);
        }

        let Some(device_type) = parse_int(raw_type) else {
            return RegisterOutcome::Rejected(RejectReason::InvalidType(raw_type.to_string()));
        };

        let name = match name.trim() {
            "" => id.to_string(),
            trimmed => trimmed.to_string(),
        };

        let record = DeviceRecord {
            id,
            name,
            device_type,
        };
        self.devices.insert(id, record.clone());
        RegisterOutcome::Accepted(record)
    }

    pub fn lookup(&self, id: DeviceId) -> Option<&DeviceRecord> {
        self.devices.get(&id)
    }

    pub fn has(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    pub fn is_ignored(&self, id: DeviceId) -> bool {
        self.ignored.contains(id)
    }

    /// All records in ascending id order.
    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> DeviceId {
        DeviceId::new(v).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = DeviceRegistry::default();

        let outcome = registry.register("00969444", "Kitchen", "25");
        let RegisterOutcome::Accepted(record) = outcome else {
            panic!("expected acceptance, got {:?}", outcome);
        };
        assert_eq!(record.id, id(969444));
        assert_eq!(record.name, "Kitchen");
        assert_eq!(record.device_type, 25);

        assert!(registry.has(id(969444)));
        assert_eq!(registry.lookup(id(969444)), Some(&record));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_defaults_to_id() {
        let mut registry = DeviceRegistry::default();
        registry.register("12345", "  ", "20");
        assert_eq!(registry.lookup(id(12345)).unwrap().name, "12345");
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = DeviceRegistry::default();
        registry.register("12345", "", "25");
        registry.register("012345", "Awning", "21");

        assert_eq!(registry.len(), 1);
        let record = registry.lookup(id(12345)).unwrap();
        assert_eq!(record.name, "Awning");
        assert_eq!(record.device_type, 21);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = DeviceRegistry::default();
        let first = registry.register("12345", "Blind", "25");
        let second = registry.register("12345", "Blind", "25");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejections_do_not_mutate() {
        let mut registry = DeviceRegistry::default();

        assert_eq!(
            registry.register("bridge", "", "25"),
            RegisterOutcome::Rejected(RejectReason::InvalidId("bridge".to_string()))
        );
        assert_eq!(
            registry.register("12345", "", "motor"),
            RegisterOutcome::Rejected(RejectReason::InvalidType("motor".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ignored_ids_never_enter() {
        let mut registry = DeviceRegistry::new(IgnoreSet::new([id(12345)]));

        assert_eq!(
            registry.register("00012345", "", "25"),
            RegisterOutcome::Ignored(id(12345))
        );
        assert!(!registry.has(id(12345)));
        assert!(registry.is_ignored(id(12345)));
    }

    #[test]
    fn test_records_are_ordered() {
        let mut registry = DeviceRegistry::default();
        registry.register("300", "", "25");
        registry.register("100", "", "20");
        registry.register("200", "", "21");

        let ids: Vec<u64> = registry.records().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![100, 200, 300]);
    }
}
