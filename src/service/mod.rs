//! Service layer for APT controller operations.
//!
//! [`AptService`] owns the device registry, the transport that reaches the
//! controllers and the driver configuration. Every operation resolves a
//! serial number, locks that device's record, leases its port for the
//! duration of one exchange and updates the record only once the exchange
//! has fully succeeded.
//!
//! # Architecture
//!
//! ```text
//! CLI / caller ──> AptService ──> DeviceRegistry (RwLock<[Arc<DeviceSlot>]>)
//!                      │
//!                      └──> PortLease ──> SerialTransport ──> SerialPortAdapter
//! ```

mod lease;
mod timing;

pub use timing::{RecordingSleeper, Sleeper, ThreadSleeper};

use std::sync::Arc;

use tracing::{debug, info};

use self::lease::PortLease;
use crate::config::Config;
use crate::error::{AptError, AptResult};
use crate::port::{SerialTransport, UsbSerialTransport};
use crate::protocol::{self, ids, Command, FrameTooShort};
use crate::registry::{DeviceRecord, DeviceRegistry};
use crate::types::{HardwareType, IdentityInfo, StageAxisInfo, VelocityParams};

/// Driver context: registry, transport and configuration.
#[derive(Debug)]
pub struct AptService<T: SerialTransport> {
    transport: T,
    registry: DeviceRegistry,
    config: Config,
    sleeper: Arc<dyn Sleeper>,
}

impl AptService<UsbSerialTransport> {
    /// Service over USB serial ports matching the configured VID/PID.
    pub fn usb(config: Config) -> Self {
        let transport = UsbSerialTransport::new(
            config.serial.vendor_id,
            config.serial.product_id,
            config.serial.port_configuration(),
        );
        Self::new(transport, config)
    }
}

impl<T: SerialTransport> AptService<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self::with_sleeper(transport, config, Arc::new(ThreadSleeper))
    }

    /// Create a service whose settle and poll delays go through `sleeper`.
    pub fn with_sleeper(transport: T, config: Config, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            transport,
            registry: DeviceRegistry::new(),
            config,
            sleeper,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ========== Registry lifecycle ==========

    /// Enumerate controllers and (re)build the registry.
    pub fn initialize(&self) -> AptResult<Vec<DeviceRecord>> {
        self.registry.initialize(&self.transport)
    }

    /// Release every record.
    pub fn teardown(&self) {
        self.registry.teardown();
    }

    /// Number of controllers of type `filter`, or of every type for `None`.
    pub fn count(&self, filter: Option<HardwareType>) -> AptResult<usize> {
        self.registry.count(filter)
    }

    pub fn nth_serial(&self, filter: Option<HardwareType>, index: usize) -> AptResult<u32> {
        self.registry.nth_serial(filter, index)
    }

    pub fn record(&self, serial: u32) -> AptResult<DeviceRecord> {
        self.registry.record(serial)
    }

    pub fn records(&self) -> AptResult<Vec<DeviceRecord>> {
        self.registry.records()
    }

    // ========== Exchange plumbing ==========

    /// Run `op` with the device's record locked.
    fn with_device<R>(
        &self,
        serial: u32,
        op: impl FnOnce(&mut DeviceRecord) -> AptResult<R>,
    ) -> AptResult<R> {
        let slot = self.registry.slot(serial)?;
        let mut record = slot.record.lock();
        op(&mut record)
    }

    fn lease(&self, record: &DeviceRecord, message_id: u16) -> AptResult<PortLease<'_>> {
        PortLease::open(
            &self.transport,
            &record.port_identifier,
            record.serial_number,
            message_id,
            &self.config,
            self.sleeper.as_ref(),
        )
    }

    /// Send `command` and read its fixed-size response.
    fn request(&self, record: &DeviceRecord, command: Command, len: usize) -> AptResult<Vec<u8>> {
        let mut lease = self.lease(record, command.message_id())?;
        lease.send(&command.encode(record.destination_byte))?;
        lease.receive(len, self.config.protocol.settle_delay())
    }

    /// Send `command` and, if `wait`, poll for its completion frame.
    fn command(&self, record: &DeviceRecord, command: Command, wait: bool) -> AptResult<()> {
        let mut lease = self.lease(record, command.message_id())?;
        lease.send(&command.encode(record.destination_byte))?;
        if wait {
            lease.await_completion(
                self.config.protocol.poll_attempts,
                self.config.protocol.poll_interval(),
            )?;
        }
        Ok(())
    }

    fn decode_failed(serial: u32, message_id: u16, e: FrameTooShort) -> AptError {
        AptError::ShortRead {
            serial,
            message_id,
            expected: e.expected,
            actual: e.actual,
        }
    }

    // ========== Controller operations ==========

    /// Read the identity block and cache it. Resets the selected channel.
    pub fn query_info(&self, serial: u32) -> AptResult<IdentityInfo> {
        self.with_device(serial, |record| {
            let command = Command::RequestInfo;
            let frame = self.request(record, command, ids::HW_INFO_LEN)?;
            let identity = protocol::decode_identity(&frame)
                .map_err(|e| Self::decode_failed(serial, command.message_id(), e))?;

            info!(
                serial,
                model = %identity.model_number,
                firmware = %identity.firmware_version,
                channels = identity.channel_count,
                "identity"
            );
            record.identity = Some(identity.clone());
            record.active_channel = None;
            Ok(identity)
        })
    }

    /// Flash the controller's front-panel LED.
    pub fn identify(&self, serial: u32) -> AptResult<()> {
        self.with_device(serial, |record| {
            self.command(record, Command::Identify, false)
        })
    }

    /// Enable or disable the drive of the current channel.
    pub fn set_channel_enable(&self, serial: u32, enabled: bool) -> AptResult<()> {
        self.with_device(serial, |record| {
            let state = if enabled {
                ids::CHANNEL_ENABLE
            } else {
                self.config.protocol.disable_encoding.byte()
            };
            let command = Command::SetChannelEnable {
                channel: record.wire_channel() as u8,
                state,
            };
            self.command(record, command, false)?;
            debug!(serial, enabled, "channel enable state sent");
            Ok(())
        })
    }

    /// Select the channel later commands address.
    ///
    /// When stage querying is configured, the new channel's stage parameters
    /// are fetched first; neither the channel nor the stage data is stored
    /// unless both steps succeed.
    pub fn select_channel(&self, serial: u32, channel: u16) -> AptResult<()> {
        self.with_device(serial, |record| {
            record.check_channel(channel)?;

            let axis_info = if self.config.protocol.query_stage_on_select {
                let command = Command::RequestStageAxisParams {
                    channel: channel as u8,
                };
                let frame = self.request(record, command, ids::STAGEAXIS_LEN)?;
                let axis = protocol::decode_stage_axis(&frame)
                    .map_err(|e| Self::decode_failed(serial, command.message_id(), e))?;
                Some(axis)
            } else {
                None
            };

            record.active_channel = Some(channel);
            if axis_info.is_some() {
                record.axis_info = axis_info;
            }
            debug!(serial, channel, "channel selected");
            Ok(())
        })
    }

    pub fn move_home(&self, serial: u32, wait: bool) -> AptResult<()> {
        self.with_device(serial, |record| {
            let command = Command::MoveHome {
                channel: record.wire_channel() as u8,
            };
            self.command(record, command, wait)?;
            info!(serial, wait, "homing");
            Ok(())
        })
    }

    /// Move by `distance` encoder counts, truncated toward zero.
    pub fn move_relative(&self, serial: u32, distance: f32, wait: bool) -> AptResult<()> {
        self.with_device(serial, |record| {
            let command = Command::MoveRelative {
                channel: record.wire_channel(),
                distance: crate::types::truncate(distance),
            };
            self.command(record, command, wait)?;
            info!(serial, distance, wait, "relative move");
            Ok(())
        })
    }

    /// Move to `position` encoder counts, truncated toward zero.
    pub fn move_absolute(&self, serial: u32, position: f32, wait: bool) -> AptResult<()> {
        self.with_device(serial, |record| {
            let command = Command::MoveAbsolute {
                message_id: self.config.protocol.absolute_move_id.message_id(),
                channel: record.wire_channel(),
                position: crate::types::truncate(position),
            };
            self.command(record, command, wait)?;
            info!(serial, position, wait, "absolute move");
            Ok(())
        })
    }

    /// Current position counter, in encoder counts.
    pub fn get_position(&self, serial: u32) -> AptResult<i32> {
        self.with_device(serial, |record| {
            let command = Command::RequestPosition {
                channel: record.wire_channel() as u8,
            };
            let frame = self.request(record, command, ids::POSCOUNTER_LEN)?;
            protocol::decode_position(&frame)
                .map_err(|e| Self::decode_failed(serial, command.message_id(), e))
        })
    }

    pub fn get_velocity_params(&self, serial: u32) -> AptResult<VelocityParams> {
        self.with_device(serial, |record| {
            let command = Command::RequestVelocityParams {
                channel: record.wire_channel() as u8,
            };
            let frame = self.request(record, command, ids::VELPARAMS_LEN)?;
            protocol::decode_velocity(&frame)
                .map_err(|e| Self::decode_failed(serial, command.message_id(), e))
        })
    }

    /// Write a velocity profile. Returns the truncated values actually sent.
    pub fn set_velocity_params(
        &self,
        serial: u32,
        min_vel: f32,
        accel: f32,
        max_vel: f32,
    ) -> AptResult<VelocityParams> {
        self.with_device(serial, |record| {
            let params = VelocityParams::from_f32(min_vel, accel, max_vel);
            let command = Command::SetVelocityParams {
                channel: record.wire_channel(),
                params,
            };
            self.command(record, command, false)?;
            debug!(serial, ?params, "velocity parameters sent");
            Ok(params)
        })
    }

    /// Stage limits of the current channel. Refreshes the cached axis data.
    pub fn get_stage_axis_info(&self, serial: u32) -> AptResult<StageAxisInfo> {
        self.with_device(serial, |record| {
            let command = Command::RequestStageAxisParams {
                channel: record.wire_channel() as u8,
            };
            let frame = self.request(record, command, ids::STAGEAXIS_LEN)?;
            let axis = protocol::decode_stage_axis(&frame)
                .map_err(|e| Self::decode_failed(serial, command.message_id(), e))?;
            let info = StageAxisInfo::from(&axis);
            record.axis_info = Some(axis);
            Ok(info)
        })
    }
}
