//! Port abstraction layer for serial communication.
//!
//! Provides the traits the protocol layer talks to, a `serialport`-backed
//! implementation for real controllers, and mocks for testing.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockSerialPort, MockTransport};
pub use sync_port::*;
pub use traits::*;
