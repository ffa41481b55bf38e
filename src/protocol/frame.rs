//! APT frame encoding.
//!
//! Every frame starts with a 6-byte header. Short messages carry two
//! parameter bytes in the header; long messages reuse bytes 2-3 as the
//! little-endian length of the data packet that follows, and flag the
//! destination byte with `0x80`.

use super::ids::*;
use crate::types::VelocityParams;

/// Decoded 6-byte APT header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_id: u16,
    pub param1: u8,
    pub param2: u8,
    pub destination: u8,
    pub source: u8,
}

impl Header {
    /// Parse the first six bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let raw: &[u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
        Some(Self {
            message_id: u16::from_le_bytes([raw[0], raw[1]]),
            param1: raw[2],
            param2: raw[3],
            destination: raw[4],
            source: raw[5],
        })
    }

    /// Whether a data packet follows this header.
    pub fn has_data(&self) -> bool {
        self.destination & DATA_PACKET_FLAG != 0
    }

    /// Length of the data packet, for long messages.
    pub fn data_len(&self) -> Option<u16> {
        self.has_data()
            .then(|| u16::from_le_bytes([self.param1, self.param2]))
    }
}

/// Body of an outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Two parameter bytes inside the header.
    Params(u8, u8),
    /// Length-prefixed data packet after the header.
    Data(Vec<u8>),
}

/// An outbound APT frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub message_id: u16,
    pub destination: u8,
    pub payload: Payload,
}

impl CommandFrame {
    /// Short message with header parameters.
    pub fn short(message_id: u16, destination: u8, param1: u8, param2: u8) -> Self {
        Self {
            message_id,
            destination,
            payload: Payload::Params(param1, param2),
        }
    }

    /// Long message with a data packet.
    pub fn long(message_id: u16, destination: u8, data: Vec<u8>) -> Self {
        Self {
            message_id,
            destination,
            payload: Payload::Data(data),
        }
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let id = self.message_id.to_le_bytes();
        match &self.payload {
            Payload::Params(p1, p2) => {
                vec![id[0], id[1], *p1, *p2, self.destination, HOST_ADDRESS]
            }
            Payload::Data(data) => {
                let len = (data.len() as u16).to_le_bytes();
                let mut out = Vec::with_capacity(HEADER_LEN + data.len());
                out.extend_from_slice(&[
                    id[0],
                    id[1],
                    len[0],
                    len[1],
                    self.destination | DATA_PACKET_FLAG,
                    HOST_ADDRESS,
                ]);
                out.extend_from_slice(data);
                out
            }
        }
    }
}

/// Data packet builder: a channel word followed by 32-bit values.
#[derive(Debug, Default)]
struct DataPacket(Vec<u8>);

impl DataPacket {
    fn channel(channel: u16) -> Self {
        Self(channel.to_le_bytes().to_vec())
    }

    fn i32(mut self, value: i32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// The APT commands this driver issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RequestInfo,
    Identify,
    SetChannelEnable { channel: u8, state: u8 },
    MoveHome { channel: u8 },
    MoveRelative { channel: u16, distance: i32 },
    MoveAbsolute { message_id: u16, channel: u16, position: i32 },
    RequestPosition { channel: u8 },
    RequestVelocityParams { channel: u8 },
    SetVelocityParams { channel: u16, params: VelocityParams },
    RequestStageAxisParams { channel: u8 },
}

impl Command {
    /// Message id carried by this command.
    pub fn message_id(&self) -> u16 {
        match self {
            Self::RequestInfo => HW_REQ_INFO,
            Self::Identify => MOD_IDENTIFY,
            Self::SetChannelEnable { .. } => MOD_SET_CHANENABLESTATE,
            Self::MoveHome { .. } => MOT_MOVE_HOME,
            Self::MoveRelative { .. } => MOT_MOVE_RELATIVE,
            Self::MoveAbsolute { message_id, .. } => *message_id,
            Self::RequestPosition { .. } => MOT_REQ_POSCOUNTER,
            Self::RequestVelocityParams { .. } => MOT_REQ_VELPARAMS,
            Self::SetVelocityParams { .. } => MOT_SET_VELPARAMS,
            Self::RequestStageAxisParams { .. } => MOT_REQ_PMDSTAGEAXISPARAMS,
        }
    }

    /// Fixed size of the response to a request, if the command has one.
    /// Motion completions are polled separately and not listed here.
    pub fn response_len(&self) -> Option<usize> {
        match self {
            Self::RequestInfo => Some(HW_INFO_LEN),
            Self::RequestPosition { .. } => Some(POSCOUNTER_LEN),
            Self::RequestVelocityParams { .. } => Some(VELPARAMS_LEN),
            Self::RequestStageAxisParams { .. } => Some(STAGEAXIS_LEN),
            _ => None,
        }
    }

    /// Build the frame addressed to `destination`.
    pub fn to_frame(&self, destination: u8) -> CommandFrame {
        let id = self.message_id();
        match *self {
            Self::RequestInfo | Self::Identify => CommandFrame::short(id, destination, 0x00, 0x00),
            Self::SetChannelEnable { channel, state } => {
                CommandFrame::short(id, destination, channel, state)
            }
            Self::MoveHome { channel }
            | Self::RequestPosition { channel }
            | Self::RequestVelocityParams { channel }
            | Self::RequestStageAxisParams { channel } => {
                CommandFrame::short(id, destination, channel, 0x00)
            }
            Self::MoveRelative { channel, distance: value }
            | Self::MoveAbsolute {
                channel,
                position: value,
                ..
            } => CommandFrame::long(
                id,
                destination,
                DataPacket::channel(channel).i32(value).finish(),
            ),
            Self::SetVelocityParams { channel, params } => CommandFrame::long(
                id,
                destination,
                DataPacket::channel(channel)
                    .i32(params.min_vel)
                    .i32(params.accel)
                    .i32(params.max_vel)
                    .finish(),
            ),
        }
    }

    /// Encode straight to wire bytes.
    pub fn encode(&self, destination: u8) -> Vec<u8> {
        self.to_frame(destination).encode()
    }
}

/// Space-separated upper-case hex, for frame traces.
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
