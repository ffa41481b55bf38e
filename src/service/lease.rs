//! Scoped access to one controller's port.
//!
//! A [`PortLease`] is opened, configured, purged and given its timeouts before
//! the first frame is written, and closes the port when dropped.

use std::time::Duration;

use tracing::{debug, warn};

use super::timing::Sleeper;
use crate::config::Config;
use crate::error::{AptError, AptResult};
use crate::port::{PortError, SerialPortAdapter, SerialTransport};
use crate::protocol::ids::{message_name, COMPLETION_LEN, HEADER_LEN};
use crate::protocol::{hex, Header};

pub(crate) struct PortLease<'a> {
    port: Box<dyn SerialPortAdapter>,
    serial: u32,
    message_id: u16,
    sleeper: &'a dyn Sleeper,
}

impl<'a> PortLease<'a> {
    /// Open `identifier` for one exchange identified by `message_id`.
    pub(crate) fn open<T>(
        transport: &T,
        identifier: &str,
        serial: u32,
        message_id: u16,
        config: &Config,
        sleeper: &'a dyn Sleeper,
    ) -> AptResult<Self>
    where
        T: SerialTransport + ?Sized,
    {
        let port = transport
            .open(identifier)
            .map_err(|e| AptError::transport(serial, message_id, e))?;
        // From here on the lease owns the port and Drop closes it.
        let mut lease = Self {
            port,
            serial,
            message_id,
            sleeper,
        };
        lease.prepare(config)?;
        Ok(lease)
    }

    fn prepare(&mut self, config: &Config) -> AptResult<()> {
        let port_config = config.serial.port_configuration();
        self.port
            .configure(&port_config)
            .and_then(|_| self.port.clear_buffers())
            .and_then(|_| {
                self.port
                    .set_timeouts(config.serial.read_timeout(), config.serial.write_timeout())
            })
            .map_err(|e| self.fail(e))
    }

    fn fail(&self, source: PortError) -> AptError {
        AptError::transport(self.serial, self.message_id, source)
    }

    /// Write a whole frame.
    pub(crate) fn send(&mut self, frame: &[u8]) -> AptResult<()> {
        debug!(
            serial = self.serial,
            port = self.port.name(),
            message = message_name(self.message_id),
            frame = %hex(frame),
            "tx"
        );
        let written = self.port.write_bytes(frame).map_err(|e| self.fail(e))?;
        if written != frame.len() {
            return Err(self.fail(PortError::IncompleteWrite {
                written,
                expected: frame.len(),
            }));
        }
        Ok(())
    }

    /// Wait `settle`, then read exactly `len` bytes.
    pub(crate) fn receive(&mut self, len: usize, settle: Duration) -> AptResult<Vec<u8>> {
        self.sleeper.sleep(settle);

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self
                .port
                .read_bytes(&mut buf[filled..])
                .map_err(|e| self.fail(e))?;
            if n == 0 {
                debug!(
                    serial = self.serial,
                    message = message_name(self.message_id),
                    partial = %hex(&buf[..filled]),
                    "rx short"
                );
                return Err(AptError::ShortRead {
                    serial: self.serial,
                    message_id: self.message_id,
                    expected: len,
                    actual: filled,
                });
            }
            filled += n;
        }

        // `buf` holds at least a header whenever a response is expected.
        if let Some(header) = Header::parse(&buf) {
            if let Some(data_len) = header.data_len() {
                if HEADER_LEN + usize::from(data_len) != len {
                    warn!(
                        serial = self.serial,
                        reply = message_name(header.message_id),
                        data_len,
                        expected = len,
                        "reply length disagrees with its header"
                    );
                }
            }
            debug!(
                serial = self.serial,
                message = message_name(self.message_id),
                reply = message_name(header.message_id),
                frame = %hex(&buf),
                "rx"
            );
        }
        Ok(buf)
    }

    /// Poll for a 6-byte completion frame, sleeping `interval` before each read.
    pub(crate) fn await_completion(
        &mut self,
        attempts: u32,
        interval: Duration,
    ) -> AptResult<Vec<u8>> {
        let mut buf = [0u8; COMPLETION_LEN];
        let mut filled = 0;
        for attempt in 1..=attempts {
            self.sleeper.sleep(interval);
            filled += self
                .port
                .read_bytes(&mut buf[filled..])
                .map_err(|e| self.fail(e))?;
            if filled == COMPLETION_LEN {
                // Any 6-byte frame ends the wait; its id is only logged.
                let reply = Header::parse(&buf).map_or(0, |h| h.message_id);
                debug!(
                    serial = self.serial,
                    message = message_name(self.message_id),
                    reply = message_name(reply),
                    attempt,
                    frame = %hex(&buf),
                    "completion"
                );
                return Ok(buf.to_vec());
            }
        }
        Err(AptError::Timeout {
            serial: self.serial,
            message_id: self.message_id,
            attempts,
        })
    }
}

impl Drop for PortLease<'_> {
    fn drop(&mut self) {
        self.port.close();
    }
}
