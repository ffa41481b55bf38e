//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialPortAdapter` trait, and provides `UsbSerialTransport`, which finds
//! APT controllers by USB vendor/product id.

use super::error::PortError;
use super::traits::{DiscoveredDevice, PortConfiguration, SerialPortAdapter, SerialTransport};
use serialport::SerialPortType;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// FTDI vendor id used by Thorlabs APT controllers.
pub const APT_VENDOR_ID: u16 = 0x0403;

/// Product id of the Thorlabs APT USB-serial bridge.
pub const APT_PRODUCT_ID: u16 = 0xFAF0;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// # Example
    /// ```no_run
    /// use apt_driver::port::{PortConfiguration, SyncSerialPort};
    ///
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &PortConfiguration::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(config.flow_control.into())
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn configure(&mut self, config: &PortConfiguration) -> Result<(), PortError> {
        // APT framing is fixed at 8N1; only rate and handshake vary.
        self.port.set_baud_rate(config.baud_rate)?;
        self.port.set_data_bits(serialport::DataBits::Eight)?;
        self.port.set_parity(serialport::Parity::None)?;
        self.port.set_stop_bits(serialport::StopBits::One)?;
        self.port.set_flow_control(config.flow_control.into())?;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let written = self.port.write(data).map_err(PortError::Io)?;
        self.port.flush().map_err(PortError::Io)?;
        Ok(written)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            // Nothing arrived within the timeout; the caller decides whether
            // that is a short read or just another poll attempt.
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeouts(&mut self, read: Duration, _write: Duration) -> Result<(), PortError> {
        // serialport exposes a single timeout used for both directions.
        self.port.set_timeout(read).map_err(PortError::Serial)
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn close(&mut self) {
        debug!(port = %self.name, "closing serial port");
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Transport over the system's USB-serial ports.
#[derive(Debug, Clone)]
pub struct UsbSerialTransport {
    vendor_id: u16,
    product_id: u16,
    config: PortConfiguration,
}

impl UsbSerialTransport {
    /// Create a transport matching the given USB identity.
    pub fn new(vendor_id: u16, product_id: u16, config: PortConfiguration) -> Self {
        Self {
            vendor_id,
            product_id,
            config,
        }
    }

    /// Whether a port's USB identity matches this transport.
    pub fn matches(&self, port_type: &SerialPortType) -> bool {
        match port_type {
            SerialPortType::UsbPort(info) => {
                info.vid == self.vendor_id && info.pid == self.product_id
            }
            _ => false,
        }
    }
}

impl Default for UsbSerialTransport {
    fn default() -> Self {
        Self::new(APT_VENDOR_ID, APT_PRODUCT_ID, PortConfiguration::default())
    }
}

impl SerialTransport for UsbSerialTransport {
    fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, PortError> {
        let ports =
            serialport::available_ports().map_err(|e| PortError::enumeration(e.to_string()))?;

        let devices = ports
            .into_iter()
            .filter(|p| self.matches(&p.port_type))
            .map(|p| {
                let serial = match &p.port_type {
                    SerialPortType::UsbPort(info) => {
                        info.serial_number.clone().unwrap_or_default()
                    }
                    _ => String::new(),
                };
                debug!(port = %p.port_name, serial = %serial, "found APT controller");
                DiscoveredDevice {
                    identifier: p.port_name,
                    serial,
                }
            })
            .collect();

        Ok(devices)
    }

    fn open(&self, identifier: &str) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = SyncSerialPort::open(identifier, &self.config)?;
        Ok(Box::new(port))
    }
}
