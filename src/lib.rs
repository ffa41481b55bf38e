//! APT Driver Library
//!
//! Host-side driver for Thorlabs APT motor controllers (TDC001, TST001,
//! BSC00x and friends) reached through FTDI USB-serial bridges.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Driver error type
//! - `port`: Port abstraction layer for serial communication
//! - `protocol`: APT frame encoding and response decoding
//! - `registry`: Discovered controllers and their cached state
//! - `service`: Device operations over leased ports
//! - `types`: Value types shared across the crate
//!
//! # Example
//!
//! ```
//! use apt_driver::{AptService, Config, MockTransport, RecordingSleeper};
//! use std::sync::Arc;
//!
//! let transport = MockTransport::new();
//! let port = transport.add_device("/dev/ttyUSB0", "83812345");
//!
//! let service = AptService::with_sleeper(
//!     transport,
//!     Config::default(),
//!     Arc::new(RecordingSleeper::new()),
//! );
//! let records = service.initialize()?;
//! assert_eq!(records[0].serial_number, 83_812_345);
//!
//! service.identify(83_812_345)?;
//! assert_eq!(port.get_write_log()[0], vec![0x23, 0x02, 0x00, 0x00, 0x50, 0x01]);
//! # Ok::<(), apt_driver::AptError>(())
//! ```

pub mod config;
pub mod error;
pub mod port;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{AptError, AptResult};
pub use port::{
    DiscoveredDevice, MockSerialPort, MockTransport, PortConfiguration, PortError,
    SerialPortAdapter, SerialTransport, SyncSerialPort, UsbSerialTransport,
};
pub use registry::{classify, DeviceRecord, DeviceRegistry};
pub use service::{AptService, RecordingSleeper, Sleeper, ThreadSleeper};
pub use types::{
    AxisInfo, FirmwareVersion, HardwareType, IdentityInfo, StageAxisInfo, VelocityParams,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
