//! APT message ids, addresses and fixed response sizes.

/// Header length of every APT frame.
pub const HEADER_LEN: usize = 6;

/// Source address of the host.
pub const HOST_ADDRESS: u8 = 0x01;

/// Destination address of a generic USB unit.
pub const GENERIC_USB_ADDRESS: u8 = 0x50;

/// Set on the destination byte when a data packet follows the header.
pub const DATA_PACKET_FLAG: u8 = 0x80;

// ============================================================================
// Message ids
// ============================================================================

pub const HW_REQ_INFO: u16 = 0x0005;
pub const HW_GET_INFO: u16 = 0x0006;
pub const MOD_SET_CHANENABLESTATE: u16 = 0x0210;
pub const MOD_IDENTIFY: u16 = 0x0223;
pub const MOT_REQ_POSCOUNTER: u16 = 0x0411;
pub const MOT_GET_POSCOUNTER: u16 = 0x0412;
pub const MOT_SET_VELPARAMS: u16 = 0x0413;
pub const MOT_REQ_VELPARAMS: u16 = 0x0414;
pub const MOT_GET_VELPARAMS: u16 = 0x0415;
pub const MOT_MOVE_HOME: u16 = 0x0443;
pub const MOT_MOVE_HOMED: u16 = 0x0444;
pub const MOT_MOVE_RELATIVE: u16 = 0x0448;
/// Absolute moves as sent by the historical backends (same id as relative).
pub const MOT_MOVE_ABSOLUTE_SHARED: u16 = MOT_MOVE_RELATIVE;
/// Absolute moves as listed in the APT protocol document.
pub const MOT_MOVE_ABSOLUTE: u16 = 0x0453;
pub const MOT_MOVE_COMPLETED: u16 = 0x0464;
pub const MOT_REQ_PMDSTAGEAXISPARAMS: u16 = 0x04F1;
pub const MOT_GET_PMDSTAGEAXISPARAMS: u16 = 0x04F2;

// ============================================================================
// Channel enable states
// ============================================================================

pub const CHANNEL_ENABLE: u8 = 0x01;
pub const CHANNEL_DISABLE: u8 = 0x02;
/// Disable byte written by the libftdi backend.
pub const CHANNEL_DISABLE_LEGACY: u8 = 0x00;

// ============================================================================
// Fixed response sizes (header included)
// ============================================================================

pub const HW_INFO_LEN: usize = 90;
pub const POSCOUNTER_LEN: usize = 12;
pub const VELPARAMS_LEN: usize = 20;
pub const STAGEAXIS_LEN: usize = 80;
pub const COMPLETION_LEN: usize = 6;

/// Human-readable name of a message id, for logs.
pub fn message_name(id: u16) -> &'static str {
    match id {
        HW_REQ_INFO => "HW_REQ_INFO",
        HW_GET_INFO => "HW_GET_INFO",
        MOD_SET_CHANENABLESTATE => "MOD_SET_CHANENABLESTATE",
        MOD_IDENTIFY => "MOD_IDENTIFY",
        MOT_REQ_POSCOUNTER => "MOT_REQ_POSCOUNTER",
        MOT_GET_POSCOUNTER => "MOT_GET_POSCOUNTER",
        MOT_SET_VELPARAMS => "MOT_SET_VELPARAMS",
        MOT_REQ_VELPARAMS => "MOT_REQ_VELPARAMS",
        MOT_GET_VELPARAMS => "MOT_GET_VELPARAMS",
        MOT_MOVE_HOME => "MOT_MOVE_HOME",
        MOT_MOVE_HOMED => "MOT_MOVE_HOMED",
        MOT_MOVE_RELATIVE => "MOT_MOVE_RELATIVE",
        MOT_MOVE_ABSOLUTE => "MOT_MOVE_ABSOLUTE",
        MOT_MOVE_COMPLETED => "MOT_MOVE_COMPLETED",
        MOT_REQ_PMDSTAGEAXISPARAMS => "MOT_REQ_PMDSTAGEAXISPARAMS",
        MOT_GET_PMDSTAGEAXISPARAMS => "MOT_GET_PMDSTAGEAXISPARAMS",
        _ => "UNKNOWN",
    }
}
