//! APT wire protocol: message ids, frame encoding and response decoding.

pub mod decode;
pub mod frame;
pub mod ids;

pub use decode::{
    decode_identity, decode_position, decode_stage_axis, decode_velocity, FrameTooShort,
};
pub use frame::{hex, Command, CommandFrame, Header, Payload};
