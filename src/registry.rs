//! Device registry: one record per enumerated controller.
//!
//! The registry is populated once by [`DeviceRegistry::initialize`] and lives
//! until [`DeviceRegistry::teardown`]. Each record sits behind its own mutex so
//! exchanges with one controller are serialized while other controllers stay
//! available; the slot table itself is behind an `RwLock` so initialize and
//! teardown are exclusive.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AptError, AptResult};
use crate::port::{DiscoveredDevice, SerialTransport};
use crate::protocol::ids::GENERIC_USB_ADDRESS;
use crate::types::{AxisInfo, HardwareType, IdentityInfo};

/// Everything known about one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub serial_number: u32,
    pub port_identifier: String,
    pub hardware_type: HardwareType,
    pub destination_byte: u8,
    pub identity: Option<IdentityInfo>,
    /// 1-based channel, unset until selected.
    pub active_channel: Option<u16>,
    pub axis_info: Option<AxisInfo>,
}

impl DeviceRecord {
    fn new(serial_number: u32, port_identifier: String) -> Self {
        let (hardware_type, destination_byte) = classify(serial_number);
        Self {
            serial_number,
            port_identifier,
            hardware_type,
            destination_byte,
            identity: None,
            active_channel: None,
            axis_info: None,
        }
    }

    /// Channel count from the cached identity, zero before the first query.
    pub fn channel_count(&self) -> u16 {
        self.identity.as_ref().map_or(0, |id| id.channel_count)
    }

    /// Check `channel` against `1..=channel_count`.
    pub fn check_channel(&self, channel: u16) -> AptResult<()> {
        let channel_count = self.channel_count();
        if channel == 0 || channel > channel_count {
            return Err(AptError::InvalidChannel {
                serial: self.serial_number,
                channel,
                channel_count,
            });
        }
        Ok(())
    }

    /// Channel id put on the wire: the selected channel, or 0 while none is.
    pub fn wire_channel(&self) -> u16 {
        self.active_channel.unwrap_or(0)
    }
}

/// Hardware type and destination byte for a serial number.
pub fn classify(serial_number: u32) -> (HardwareType, u8) {
    let prefix = serial_number / 1_000_000;
    let hardware_type = HardwareType::KNOWN
        .into_iter()
        .find(|t| t.serial_prefix() == Some(prefix))
        .unwrap_or(HardwareType::Unknown);
    (hardware_type, GENERIC_USB_ADDRESS)
}

/// Leading decimal digits of a transport serial string.
pub fn parse_serial(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// A record plus the immutable fields lookups need without taking its lock.
#[derive(Debug)]
pub(crate) struct DeviceSlot {
    pub(crate) serial_number: u32,
    pub(crate) hardware_type: HardwareType,
    pub(crate) record: Mutex<DeviceRecord>,
}

impl DeviceSlot {
    fn new(record: DeviceRecord) -> Self {
        Self {
            serial_number: record.serial_number,
            hardware_type: record.hardware_type,
            record: Mutex::new(record),
        }
    }
}

#[derive(Debug, Default)]
enum RegistryState {
    #[default]
    NotInitialized,
    Ready(Vec<Arc<DeviceSlot>>),
}

/// Table of discovered controllers.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate `transport` and rebuild the table from what it reports.
    pub fn initialize<T>(&self, transport: &T) -> AptResult<Vec<DeviceRecord>>
    where
        T: SerialTransport + ?Sized,
    {
        let devices = transport.enumerate().map_err(AptError::Enumeration)?;
        let slots = Self::build(devices)?;
        let snapshot = slots.iter().map(|slot| slot.record.lock().clone()).collect();

        info!(count = slots.len(), "device registry initialized");
        *self.state.write() = RegistryState::Ready(slots);
        Ok(snapshot)
    }

    fn build(devices: Vec<DiscoveredDevice>) -> AptResult<Vec<Arc<DeviceSlot>>> {
        if devices.is_empty() {
            return Err(AptError::NoDeviceFound);
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(devices.len())
            .map_err(|_| AptError::AllocationFailed)?;

        for device in devices {
            let Some(serial_number) = parse_serial(&device.serial) else {
                warn!(
                    port = %device.identifier,
                    serial = %device.serial,
                    "skipping device with unparseable serial number"
                );
                continue;
            };
            let record = DeviceRecord::new(serial_number, device.identifier);
            if record.hardware_type == HardwareType::Unknown {
                warn!(
                    serial = serial_number,
                    port = %record.port_identifier,
                    "serial number outside known hardware ranges"
                );
            }
            slots.push(Arc::new(DeviceSlot::new(record)));
        }

        if slots.is_empty() {
            return Err(AptError::NoDeviceFound);
        }
        Ok(slots)
    }

    /// Drop every record. Later calls fail with `NotInitialized`.
    pub fn teardown(&self) {
        let previous = std::mem::take(&mut *self.state.write());
        if let RegistryState::Ready(slots) = previous {
            info!(count = slots.len(), "device registry released");
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.state.read(), RegistryState::Ready(_))
    }

    fn with_slots<R>(
        &self,
        f: impl FnOnce(&[Arc<DeviceSlot>]) -> AptResult<R>,
    ) -> AptResult<R> {
        match &*self.state.read() {
            RegistryState::Ready(slots) => f(slots),
            RegistryState::NotInitialized => Err(AptError::NotInitialized),
        }
    }

    /// Index of the record for `serial_number`.
    pub fn resolve(&self, serial_number: u32) -> AptResult<usize> {
        self.with_slots(|slots| {
            slots
                .iter()
                .position(|slot| slot.serial_number == serial_number)
                .ok_or(AptError::DeviceNotFound {
                    serial: serial_number,
                })
        })
    }

    /// Shared handle to the record for `serial_number`.
    pub(crate) fn slot(&self, serial_number: u32) -> AptResult<Arc<DeviceSlot>> {
        self.with_slots(|slots| {
            slots
                .iter()
                .find(|slot| slot.serial_number == serial_number)
                .cloned()
                .ok_or(AptError::DeviceNotFound {
                    serial: serial_number,
                })
        })
    }

    fn matching(&self, filter: Option<HardwareType>) -> AptResult<Vec<u32>> {
        self.with_slots(|slots| {
            Ok(slots
                .iter()
                .filter(|slot| filter.map_or(true, |f| f == slot.hardware_type))
                .map(|slot| slot.serial_number)
                .collect())
        })
    }

    /// Number of devices of type `filter`, or of every type for `None`.
    pub fn count(&self, filter: Option<HardwareType>) -> AptResult<usize> {
        self.matching(filter).map(|serials| serials.len())
    }

    /// Serial number of the `index`-th device of type `filter`.
    ///
    /// Without a filter the index is clamped to the last device.
    pub fn nth_serial(&self, filter: Option<HardwareType>, index: usize) -> AptResult<u32> {
        let serials = self.matching(filter)?;
        match filter {
            None => serials
                .get(index.min(serials.len().saturating_sub(1)))
                .copied()
                .ok_or(AptError::NoDeviceFound),
            Some(hardware_type) => serials
                .get(index)
                .copied()
                .ok_or(AptError::IndexOutOfRange {
                    hardware_type,
                    index,
                    count: serials.len(),
                }),
        }
    }

    /// Select `channel` without talking to the controller.
    pub fn set_channel(&self, serial_number: u32, channel: u16) -> AptResult<()> {
        let slot = self.slot(serial_number)?;
        let mut record = slot.record.lock();
        record.check_channel(channel)?;
        record.active_channel = Some(channel);
        Ok(())
    }

    /// Copy of one record.
    pub fn record(&self, serial_number: u32) -> AptResult<DeviceRecord> {
        let slot = self.slot(serial_number)?;
        let record = slot.record.lock().clone();
        Ok(record)
    }

    /// Copies of every record, in enumeration order.
    pub fn records(&self) -> AptResult<Vec<DeviceRecord>> {
        self.with_slots(|slots| {
            Ok(slots
                .iter()
                .map(|slot| slot.record.lock().clone())
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockTransport;
    use crate::types::FirmwareVersion;
    use proptest::prelude::*;

    fn identity(channel_count: u16) -> IdentityInfo {
        IdentityInfo {
            model_number: "BSC002".to_string(),
            hardware_type_code: 0,
            firmware_version: FirmwareVersion {
                major: 1,
                minor: 0,
                build: 0,
            },
            notes: String::new(),
            hardware_version: 1,
            mod_state: 0,
            channel_count,
        }
    }

    fn registry_with(serials: &[&str]) -> DeviceRegistry {
        let transport = MockTransport::new();
        for (i, sn) in serials.iter().enumerate() {
            transport.add_device(&format!("/dev/ttyUSB{i}"), sn);
        }
        let registry = DeviceRegistry::new();
        registry.initialize(&transport).unwrap();
        registry
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(classify(83_812_345), (HardwareType::Tdc001, 0x50));
        assert_eq!(classify(20_000_000), (HardwareType::Bsc001, 0x50));
        assert_eq!(classify(63_999_999), (HardwareType::Odc001, 0x50));
        assert_eq!(classify(45_000_000), (HardwareType::Unknown, 0x50));
        assert_eq!(classify(0), (HardwareType::Unknown, 0x50));
    }

    #[test]
    fn test_parse_serial_leading_digits() {
        assert_eq!(parse_serial("83812345"), Some(83_812_345));
        assert_eq!(parse_serial("83812345A"), Some(83_812_345));
        assert_eq!(parse_serial(" 20000001"), Some(20_000_001));
        assert_eq!(parse_serial("FT1234"), None);
        assert_eq!(parse_serial(""), None);
    }

    #[test]
    fn test_initialize_classifies_and_skips() {
        let transport = MockTransport::new();
        transport.add_device("/dev/ttyUSB0", "83000001");
        transport.add_device("/dev/ttyUSB1", "not-a-serial");
        transport.add_device("/dev/ttyUSB2", "45000001");

        let registry = DeviceRegistry::new();
        let records = registry.initialize(&transport).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hardware_type, HardwareType::Tdc001);
        assert_eq!(records[0].port_identifier, "/dev/ttyUSB0");
        assert_eq!(records[1].hardware_type, HardwareType::Unknown);
        assert!(records.iter().all(|r| r.active_channel.is_none()));
    }

    #[test]
    fn test_initialize_without_devices() {
        let registry = DeviceRegistry::new();
        let err = registry.initialize(&MockTransport::new()).unwrap_err();
        assert!(matches!(err, AptError::NoDeviceFound));
        assert!(!registry.is_initialized());

        let transport = MockTransport::new();
        transport.add_device("/dev/ttyUSB0", "garbage");
        assert!(matches!(
            registry.initialize(&transport),
            Err(AptError::NoDeviceFound)
        ));
    }

    #[test]
    fn test_initialize_enumeration_failure() {
        let transport = MockTransport::new();
        transport.fail_enumeration("libusb unavailable");
        let registry = DeviceRegistry::new();
        assert!(matches!(
            registry.initialize(&transport),
            Err(AptError::Enumeration(_))
        ));
    }

    #[test]
    fn test_reinitialize_replaces_table() {
        let registry = registry_with(&["83000001", "83000002"]);
        let transport = MockTransport::new();
        transport.add_device("/dev/ttyUSB5", "20000001");
        registry.initialize(&transport).unwrap();

        assert_eq!(registry.count(None).unwrap(), 1);
        assert!(matches!(
            registry.resolve(83_000_001),
            Err(AptError::DeviceNotFound { serial: 83_000_001 })
        ));
    }

    #[test]
    fn test_count_and_nth_serial() {
        let registry = registry_with(&["83000001", "20000001", "83000002"]);
        assert_eq!(registry.count(None).unwrap(), 3);
        assert_eq!(registry.count(Some(HardwareType::Tdc001)).unwrap(), 2);
        assert_eq!(registry.count(Some(HardwareType::Tst001)).unwrap(), 0);

        assert_eq!(
            registry.nth_serial(Some(HardwareType::Tdc001), 1).unwrap(),
            83_000_002
        );
        let err = registry
            .nth_serial(Some(HardwareType::Tdc001), 2)
            .unwrap_err();
        assert!(matches!(
            err,
            AptError::IndexOutOfRange {
                hardware_type: HardwareType::Tdc001,
                index: 2,
                count: 2
            }
        ));
        assert_eq!(err.to_string(), "no TDC001 device at index 2 (2 present)");
        // unfiltered lookups clamp to the last device
        assert_eq!(registry.nth_serial(None, 99).unwrap(), 83_000_002);
        assert_eq!(registry.nth_serial(None, 0).unwrap(), 83_000_001);
    }

    #[test]
    fn test_set_channel_bounds() {
        let registry = registry_with(&["30000001"]);
        let slot = registry.slot(30_000_001).unwrap();

        // no identity yet
        assert!(matches!(
            registry.set_channel(30_000_001, 1),
            Err(AptError::InvalidChannel {
                channel_count: 0,
                ..
            })
        ));

        slot.record.lock().identity = Some(identity(1));
        registry.set_channel(30_000_001, 1).unwrap();
        let err = registry.set_channel(30_000_001, 2).unwrap_err();
        assert!(matches!(
            err,
            AptError::InvalidChannel {
                serial: 30_000_001,
                channel: 2,
                channel_count: 1
            }
        ));
        assert!(registry.set_channel(30_000_001, 0).is_err());
        assert_eq!(registry.record(30_000_001).unwrap().active_channel, Some(1));
    }

    #[test]
    fn test_teardown() {
        let registry = registry_with(&["83000001"]);
        registry.teardown();
        assert!(matches!(registry.count(None), Err(AptError::NotInitialized)));
        assert!(matches!(registry.records(), Err(AptError::NotInitialized)));
        assert!(matches!(
            registry.resolve(83_000_001),
            Err(AptError::NotInitialized)
        ));
        // idempotent
        registry.teardown();
    }

    #[test]
    fn test_wire_channel_defaults_to_zero() {
        let registry = registry_with(&["30000001"]);
        let slot = registry.slot(30_000_001).unwrap();
        assert_eq!(slot.record.lock().wire_channel(), 0);

        slot.record.lock().identity = Some(identity(2));
        registry.set_channel(30_000_001, 2).unwrap();
        assert_eq!(slot.record.lock().wire_channel(), 2);
    }

    #[test]
    fn test_records_are_copies() {
        let registry = registry_with(&["83000001"]);
        let mut copy = registry.record(83_000_001).unwrap();
        copy.active_channel = Some(3);
        assert_eq!(registry.record(83_000_001).unwrap().active_channel, None);
    }

    proptest! {
        #[test]
        fn prop_known_ranges_classify(offset in 0u32..1_000_000, idx in 0usize..8) {
            let expected = HardwareType::KNOWN[idx];
            let serial = expected.serial_prefix().unwrap() * 1_000_000 + offset;
            prop_assert_eq!(classify(serial), (expected, 0x50));
        }

        #[test]
        fn prop_other_ranges_are_unknown(serial in any::<u32>()) {
            let prefix = serial / 1_000_000;
            prop_assume!(![20, 30, 40, 60, 63, 70, 80, 83].contains(&prefix));
            prop_assert_eq!(classify(serial), (HardwareType::Unknown, 0x50));
        }
    }
}
