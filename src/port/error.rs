//! Port-specific error types.
//!
//! Defines error types for the serial transport, separate from the protocol
//! errors in [`crate::error`] so that the collaborator's native error is kept
//! intact as a source.

use thiserror::Error;

/// Errors that can occur during serial transport operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fewer bytes were accepted by the port than were handed to it.
    #[error("Incomplete write: {written} of {expected} bytes")]
    IncompleteWrite { written: usize, expected: usize },

    /// Device enumeration failed.
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Enumeration error from a message.
    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::Enumeration(message.into())
    }
}
