//! Core traits for the serial transport.
//!
//! `SerialPortAdapter` abstracts one open port; `SerialTransport` abstracts
//! discovery and opening. Both real USB-serial ports and the scripted mocks
//! implement them, so the protocol layer never touches `serialport` directly.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line settings applied to a port right after it is opened.
///
/// Character framing is always 8N1 on APT controllers and is not
/// configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfiguration {
    pub baud_rate: u32,
    pub flow_control: FlowControl,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for PortConfiguration {
    /// 115200 baud without handshaking, and a 3 s timeout while the board
    /// finishes its reset.
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_millis(3000),
            write_timeout: Duration::from_millis(3000),
        }
    }
}

/// Handshake on the USB-serial bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowControl {
    #[default]
    None,
    /// RTS/CTS, which the controller firmware also honours.
    RtsCts,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::RtsCts => serialport::FlowControl::Hardware,
        }
    }
}

/// A controller found on the USB bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Identifier handed back to [`SerialTransport::open`].
    pub identifier: String,
    /// Raw USB serial-number string.
    pub serial: String,
}

/// Trait for serial port I/O operations on one open port.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Apply line settings (baud rate, framing, flow control).
    fn configure(&mut self, config: &PortConfiguration) -> Result<(), PortError>;

    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read. A read that times out with
    /// nothing available returns `Ok(0)`.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Set the read and write timeouts for this port.
    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<(), PortError>;

    /// Discard any unread input and any unsent output.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Release the port. Called exactly once, when the lease is dropped.
    fn close(&mut self) {}
}

/// Discovery and opening of APT controllers.
pub trait SerialTransport: Send + Sync {
    /// List every attached device matching the configured USB identity.
    fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, PortError>;

    /// Open the device behind `identifier`. Line settings are applied by the
    /// caller through [`SerialPortAdapter::configure`].
    fn open(&self, identifier: &str) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
