//! Fixed-offset decoding of APT response frames.
//!
//! All multi-byte fields are little-endian. Offsets below are absolute
//! within the frame, header included.

use thiserror::Error;

use super::ids::{HW_INFO_LEN, POSCOUNTER_LEN, STAGEAXIS_LEN, VELPARAMS_LEN};
use crate::types::{AxisInfo, FirmwareVersion, IdentityInfo, VelocityParams};

/// A response buffer ended before a field it must contain.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("frame too short: expected {expected} bytes, got {actual}")]
pub struct FrameTooShort {
    pub expected: usize,
    pub actual: usize,
}

pub type DecodeResult<T> = Result<T, FrameTooShort>;

fn field<const N: usize>(buf: &[u8], offset: usize) -> DecodeResult<[u8; N]> {
    buf.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(FrameTooShort {
            expected: offset + N,
            actual: buf.len(),
        })
}

pub fn read_u16_at(buf: &[u8], offset: usize) -> DecodeResult<u16> {
    field::<2>(buf, offset).map(u16::from_le_bytes)
}

pub fn read_u32_at(buf: &[u8], offset: usize) -> DecodeResult<u32> {
    field::<4>(buf, offset).map(u32::from_le_bytes)
}

pub fn read_i32_at(buf: &[u8], offset: usize) -> DecodeResult<i32> {
    field::<4>(buf, offset).map(i32::from_le_bytes)
}

/// Fixed-width text field, cut at the first NUL and decoded lossily.
pub fn read_str_at(buf: &[u8], offset: usize, len: usize) -> DecodeResult<String> {
    let raw = buf.get(offset..offset + len).ok_or(FrameTooShort {
        expected: offset + len,
        actual: buf.len(),
    })?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

fn require(buf: &[u8], expected: usize) -> DecodeResult<()> {
    if buf.len() < expected {
        return Err(FrameTooShort {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Decode a 90-byte `HW_GET_INFO` response.
pub fn decode_identity(buf: &[u8]) -> DecodeResult<IdentityInfo> {
    require(buf, HW_INFO_LEN)?;
    Ok(IdentityInfo {
        model_number: read_str_at(buf, 10, 8)?,
        hardware_type_code: read_u16_at(buf, 18)?,
        firmware_version: FirmwareVersion {
            build: buf[20],
            minor: buf[21],
            major: buf[22],
        },
        notes: read_str_at(buf, 24, 48)?,
        hardware_version: read_u16_at(buf, 84)?,
        mod_state: read_u16_at(buf, 86)?,
        channel_count: read_u16_at(buf, 88)?,
    })
}

/// Decode an 80-byte `MOT_GET_PMDSTAGEAXISPARAMS` response.
pub fn decode_stage_axis(buf: &[u8]) -> DecodeResult<AxisInfo> {
    require(buf, STAGEAXIS_LEN)?;
    Ok(AxisInfo {
        stage_id: read_u16_at(buf, 8)?,
        axis_id: read_u16_at(buf, 10)?,
        part_number: read_str_at(buf, 12, 16)?,
        axis_serial: read_u32_at(buf, 28)?,
        counts_per_unit: read_u32_at(buf, 32)?,
        min_pos: read_i32_at(buf, 36)?,
        max_pos: read_i32_at(buf, 40)?,
        max_accel: read_i32_at(buf, 44)?,
        max_decel: read_i32_at(buf, 48)?,
        max_vel: read_i32_at(buf, 52)?,
    })
}

/// Decode a 12-byte `MOT_GET_POSCOUNTER` response into encoder counts.
pub fn decode_position(buf: &[u8]) -> DecodeResult<i32> {
    require(buf, POSCOUNTER_LEN)?;
    read_i32_at(buf, 8)
}

/// Decode a 20-byte `MOT_GET_VELPARAMS` response.
pub fn decode_velocity(buf: &[u8]) -> DecodeResult<VelocityParams> {
    require(buf, VELPARAMS_LEN)?;
    Ok(VelocityParams {
        min_vel: read_i32_at(buf, 8)?,
        accel: read_i32_at(buf, 12)?,
        max_vel: read_i32_at(buf, 16)?,
    })
}
