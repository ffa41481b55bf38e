//! Mock serial port and transport for testing.
//!
//! `MockSerialPort` simulates a controller without hardware: scripted replies
//! are released into the receive queue each time a frame is written, every
//! write is logged, and counters record reads, opens and closes so tests can
//! check poll budgets and that ports are always released.

use super::error::PortError;
use super::traits::{DiscoveredDevice, PortConfiguration, SerialPortAdapter, SerialTransport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock port, shared between clones.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes returned by read operations.
    read_queue: VecDeque<u8>,
    /// Replies moved into `read_queue`, one per write.
    replies: VecDeque<Vec<u8>>,
    /// Log of all frames written to the port.
    write_log: Vec<Vec<u8>>,
    /// Number of upcoming reads that return nothing regardless of the queue.
    stalled_reads: usize,
    /// Most bytes a single read hands back, to model frames arriving in pieces.
    read_chunk: Option<usize>,
    /// Total read calls.
    read_calls: usize,
    /// Times the port was handed out by a transport.
    opens: usize,
    /// Times the port was closed.
    closes: usize,
    /// Whether the next write should fail.
    fail_next_write: bool,
    /// Whether the next read should fail.
    fail_next_read: bool,
    /// Last applied line settings.
    configuration: Option<PortConfiguration>,
    /// Last applied read/write timeouts.
    timeouts: Option<(Duration, Duration)>,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
}

/// Mock serial port implementation for testing.
///
/// # Example
/// ```
/// use apt_driver::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_reply(&[0x44, 0x04, 0x01, 0x00, 0x01, 0x50]);
///
/// port.write_bytes(&[0x43, 0x04, 0x01, 0x00, 0x50, 0x01]).unwrap();
/// let mut buffer = [0u8; 6];
/// assert_eq!(port.read_bytes(&mut buffer).unwrap(), 6);
/// assert_eq!(port.get_write_log().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared so tests keep a handle after the driver
    /// takes its own clone.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Enqueue bytes that are readable straight away.
    ///
    /// Note that a purge discards them, so replies to requests should use
    /// [`MockSerialPort::enqueue_reply`].
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Enqueue a reply that becomes readable after the next write.
    pub fn enqueue_reply(&mut self, data: &[u8]) {
        self.state.lock().replies.push_back(data.to_vec());
    }

    /// Make the next `count` reads return zero bytes.
    pub fn stall_reads(&mut self, count: usize) {
        self.state.lock().stalled_reads = count;
    }

    /// Return at most `bytes` per read from now on.
    pub fn limit_read_chunk(&mut self, bytes: usize) {
        self.state.lock().read_chunk = Some(bytes);
    }

    /// Get a copy of all frames written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Clear the write log.
    pub fn clear_write_log(&mut self) {
        self.state.lock().write_log.clear();
    }

    /// Fail the next write with an I/O error.
    pub fn fail_next_write(&mut self) {
        self.state.lock().fail_next_write = true;
    }

    /// Fail the next read with an I/O error.
    pub fn fail_next_read(&mut self) {
        self.state.lock().fail_next_read = true;
    }

    /// Number of read calls made so far.
    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    /// Number of times a transport opened this port.
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of times the port was closed.
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Line settings applied by the last `configure` call.
    pub fn configuration(&self) -> Option<PortConfiguration> {
        self.state.lock().configuration.clone()
    }

    /// Timeouts applied by the last `set_timeouts` call.
    pub fn timeouts(&self) -> Option<(Duration, Duration)> {
        self.state.lock().timeouts
    }

    /// Get whether buffers have been cleared.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn record_open(&self) {
        self.state.lock().opens += 1;
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn configure(&mut self, config: &PortConfiguration) -> Result<(), PortError> {
        self.state.lock().configuration = Some(config.clone());
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }

        state.write_log.push(data.to_vec());

        if let Some(reply) = state.replies.pop_front() {
            state.read_queue.extend(reply);
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.read_calls += 1;

        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock read failure",
            )));
        }

        if state.stalled_reads > 0 {
            state.stalled_reads -= 1;
            return Ok(0);
        }

        let limit = state.read_chunk.unwrap_or(buffer.len()).min(buffer.len());
        let mut bytes_read = 0;
        for byte in buffer[..limit].iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        Ok(bytes_read)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<(), PortError> {
        self.state.lock().timeouts = Some((read, write));
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().closes += 1;
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[derive(Debug, Default)]
struct MockTransportState {
    devices: Vec<(DiscoveredDevice, MockSerialPort)>,
    enumeration_error: Option<String>,
    unopenable: Vec<String>,
}

/// Transport that hands out [`MockSerialPort`]s instead of real devices.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    /// Create a transport with no attached devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device and return a handle to its port.
    pub fn add_device(&self, identifier: &str, serial: &str) -> MockSerialPort {
        let port = MockSerialPort::new(identifier);
        self.state.lock().devices.push((
            DiscoveredDevice {
                identifier: identifier.to_string(),
                serial: serial.to_string(),
            },
            port.clone(),
        ));
        port
    }

    /// Make the next enumeration fail.
    pub fn fail_enumeration(&self, message: &str) {
        self.state.lock().enumeration_error = Some(message.to_string());
    }

    /// Make every open of `identifier` fail.
    pub fn fail_open(&self, identifier: &str) {
        self.state.lock().unopenable.push(identifier.to_string());
    }
}

impl SerialTransport for MockTransport {
    fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, PortError> {
        let mut state = self.state.lock();
        if let Some(message) = state.enumeration_error.take() {
            return Err(PortError::enumeration(message));
        }
        Ok(state.devices.iter().map(|(d, _)| d.clone()).collect())
    }

    fn open(&self, identifier: &str) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let state = self.state.lock();
        if state.unopenable.iter().any(|id| id == identifier) {
            return Err(PortError::not_found(identifier));
        }
        let port = state
            .devices
            .iter()
            .find(|(d, _)| d.identifier == identifier)
            .map(|(_, port)| port.clone())
            .ok_or_else(|| PortError::not_found(identifier))?;
        port.record_open();
        Ok(Box::new(port))
    }
}
