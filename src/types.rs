//! Device-level value types shared by the registry, the codec and callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Product family, derived from the serial-number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareType {
    /// Legacy single channel stepper driver.
    Bsc001,
    /// Legacy dual channel stepper driver.
    Bsc002,
    /// Single channel stepper driver.
    Bsc101,
    /// OptoSTDriver mini stepper driver.
    Ost001,
    /// OptoDCDriver mini DC servo driver.
    Odc001,
    /// Three channel card slot stepper driver.
    Scc001,
    /// T-Cube stepper driver.
    Tst001,
    /// T-Cube DC servo driver.
    Tdc001,
    /// Serial number outside every known range.
    Unknown,
}

impl HardwareType {
    /// Every recognised family, in `HWTYPE_*` order.
    pub const KNOWN: [HardwareType; 8] = [
        HardwareType::Bsc001,
        HardwareType::Bsc101,
        HardwareType::Bsc002,
        HardwareType::Scc001,
        HardwareType::Odc001,
        HardwareType::Ost001,
        HardwareType::Tst001,
        HardwareType::Tdc001,
    ];

    /// Serial-number prefix (`serial / 1_000_000`) of this family.
    pub fn serial_prefix(self) -> Option<u32> {
        match self {
            Self::Bsc001 => Some(20),
            Self::Bsc002 => Some(30),
            Self::Bsc101 => Some(40),
            Self::Ost001 => Some(60),
            Self::Odc001 => Some(63),
            Self::Scc001 => Some(70),
            Self::Tst001 => Some(80),
            Self::Tdc001 => Some(83),
            Self::Unknown => None,
        }
    }

    /// Numeric `HWTYPE_*` code used by the vendor API.
    pub fn code(self) -> u32 {
        match self {
            Self::Bsc001 => 11,
            Self::Bsc101 => 12,
            Self::Bsc002 => 13,
            Self::Scc001 => 21,
            Self::Odc001 => 24,
            Self::Ost001 => 25,
            Self::Tst001 => 29,
            Self::Tdc001 => 31,
            Self::Unknown => 0,
        }
    }

    /// Inverse of [`HardwareType::code`]. Code `0` is "any device" and maps to
    /// `None`, as does any unrecognised code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::KNOWN.into_iter().find(|t| t.code() == code)
    }

    /// Model name as printed on the unit.
    pub fn model(self) -> &'static str {
        match self {
            Self::Bsc001 => "BSC001",
            Self::Bsc002 => "BSC002",
            Self::Bsc101 => "BSC101",
            Self::Ost001 => "OST001",
            Self::Odc001 => "ODC001",
            Self::Scc001 => "SCC001",
            Self::Tst001 => "TST001",
            Self::Tdc001 => "TDC001",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HardwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model())
    }
}

/// Firmware version reported by `HW_GET_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Identity block of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub model_number: String,
    /// Hardware type word as reported by the unit (not the serial-prefix class).
    pub hardware_type_code: u16,
    pub firmware_version: FirmwareVersion,
    pub notes: String,
    pub hardware_version: u16,
    pub mod_state: u16,
    pub channel_count: u16,
}

/// Stage/axis parameters of the selected channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisInfo {
    pub stage_id: u16,
    pub axis_id: u16,
    pub part_number: String,
    pub axis_serial: u32,
    pub counts_per_unit: u32,
    pub min_pos: i32,
    pub max_pos: i32,
    pub max_accel: i32,
    pub max_decel: i32,
    pub max_vel: i32,
}

/// Stage limits in the shape of the vendor's `MOT_GetStageAxisInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageAxisInfo {
    pub min_pos: f32,
    pub max_pos: f32,
    pub units: u32,
    /// Not carried by the stage-parameter message; always zero.
    pub pitch: f32,
}

impl From<&AxisInfo> for StageAxisInfo {
    fn from(axis: &AxisInfo) -> Self {
        Self {
            min_pos: axis.min_pos as f32,
            max_pos: axis.max_pos as f32,
            units: axis.counts_per_unit,
            pitch: 0.0,
        }
    }
}

/// Trapezoidal velocity profile, in encoder counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityParams {
    pub min_vel: i32,
    pub accel: i32,
    pub max_vel: i32,
}

impl VelocityParams {
    /// Build from physical values, truncating each toward zero.
    pub fn from_f32(min_vel: f32, accel: f32, max_vel: f32) -> Self {
        Self {
            min_vel: truncate(min_vel),
            accel: truncate(accel),
            max_vel: truncate(max_vel),
        }
    }
}

/// Float to wire count: truncation toward zero, saturating at the i32 range.
pub fn truncate(value: f32) -> i32 {
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for t in HardwareType::KNOWN {
            assert_eq!(HardwareType::from_code(t.code()), Some(t));
        }
        assert_eq!(HardwareType::from_code(0), None);
        assert_eq!(HardwareType::from_code(99), None);
    }

    #[test]
    fn test_firmware_display() {
        let v = FirmwareVersion {
            major: 2,
            minor: 10,
            build: 5,
        };
        assert_eq!(v.to_string(), "2.10.5");
    }

    #[test]
    fn test_truncation_not_rounding() {
        assert_eq!(truncate(13.744), 13);
        assert_eq!(truncate(-2.9), -2);
        assert_eq!(truncate(0.999), 0);
        assert_eq!(truncate(f32::NAN), 0);
        let p = VelocityParams::from_f32(0.5, 137.44, 13_287_582.0);
        assert_eq!((p.min_vel, p.accel, p.max_vel), (0, 137, 13_287_582));
    }

    #[test]
    fn test_stage_axis_info_pitch_is_zero() {
        let axis = AxisInfo {
            stage_id: 1,
            axis_id: 1,
            part_number: "MTS50".to_string(),
            axis_serial: 7,
            counts_per_unit: 34_304,
            min_pos: 0,
            max_pos: 1_715_200,
            max_accel: 10,
            max_decel: 10,
            max_vel: 20,
        };
        let info = StageAxisInfo::from(&axis);
        assert_eq!(info.units, 34_304);
        assert_eq!(info.max_pos, 1_715_200.0);
        assert_eq!(info.pitch, 0.0);
    }
}
