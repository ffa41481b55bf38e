use thiserror::Error;

use crate::port::PortError;
use crate::protocol::ids::message_name;
use crate::types::HardwareType;

/// A specialized `Result` type for driver operations.
pub type AptResult<T> = Result<T, AptError>;

/// Errors returned by the device registry and transport session.
#[derive(Error, Debug)]
pub enum AptError {
    /// Enumeration matched zero controllers.
    #[error("no APT controller found")]
    NoDeviceFound,

    /// The serial number is not in the registry.
    #[error("device {serial} not found")]
    DeviceNotFound { serial: u32 },

    /// A typed lookup asked for more devices of that type than are attached.
    #[error("no {hardware_type} device at index {index} ({count} present)")]
    IndexOutOfRange {
        hardware_type: HardwareType,
        index: usize,
        count: usize,
    },

    #[error("channel {channel} out of range for device {serial} (channels 1..={channel_count})")]
    InvalidChannel {
        serial: u32,
        channel: u16,
        channel_count: u16,
    },

    /// Opening, configuring, writing or reading the port failed.
    #[error("transport error on device {serial} during {}: {source}", message_name(*.message_id))]
    Transport {
        serial: u32,
        message_id: u16,
        #[source]
        source: PortError,
    },

    #[error(
        "short read from device {serial} for {}: expected {expected} bytes, got {actual}",
        message_name(*.message_id)
    )]
    ShortRead {
        serial: u32,
        message_id: u16,
        expected: usize,
        actual: usize,
    },

    /// No completion frame arrived within the poll budget.
    #[error(
        "device {serial} did not complete {} after {attempts} polls",
        message_name(*.message_id)
    )]
    Timeout {
        serial: u32,
        message_id: u16,
        attempts: u32,
    },

    #[error("driver not initialized")]
    NotInitialized,

    #[error("could not reserve storage for device records")]
    AllocationFailed,

    /// The transport could not list devices.
    #[error("device enumeration failed: {0}")]
    Enumeration(#[source] PortError),
}

impl AptError {
    pub(crate) fn transport(serial: u32, message_id: u16, source: PortError) -> Self {
        Self::Transport {
            serial,
            message_id,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_command() {
        let err = AptError::Timeout {
            serial: 83_000_001,
            message_id: 0x0443,
            attempts: 10,
        };
        assert_eq!(
            err.to_string(),
            "device 83000001 did not complete MOT_MOVE_HOME after 10 polls"
        );

        let err = AptError::ShortRead {
            serial: 83_000_001,
            message_id: 0x0005,
            expected: 90,
            actual: 5,
        };
        assert!(err.to_string().contains("HW_REQ_INFO"));
    }

    #[test]
    fn test_transport_keeps_source() {
        let err = AptError::transport(1, 0x0411, PortError::not_found("/dev/ttyUSB0"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("MOT_REQ_POSCOUNTER"));
    }
}
