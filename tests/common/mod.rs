//! Shared test utilities for APT driver tests.
//!
//! This module provides common test infrastructure including:
//! - Response frame builders matching what controllers send
//! - A harness wiring mock ports into an initialized service

#![allow(dead_code)]

use apt_driver::config::Config;
use apt_driver::{AptService, MockSerialPort, MockTransport, RecordingSleeper, VelocityParams};
use std::sync::Arc;

pub const TDC_SERIAL: u32 = 83_812_345;
pub const BSC_SERIAL: u32 = 30_000_042;

/// 90-byte `HW_GET_INFO` response.
pub fn identity_frame(serial: u32, model: &str, channel_count: u16) -> Vec<u8> {
    let mut buf = vec![0u8; 90];
    buf[..6].copy_from_slice(&[0x06, 0x00, 0x54, 0x00, 0x81, 0x50]);
    buf[6..10].copy_from_slice(&serial.to_le_bytes());
    let model = model.as_bytes();
    buf[10..10 + model.len().min(8)].copy_from_slice(&model[..model.len().min(8)]);
    buf[18..20].copy_from_slice(&16u16.to_le_bytes());
    // firmware 2.10.5, stored build, minor, major
    buf[20..23].copy_from_slice(&[5, 10, 2]);
    buf[24..37].copy_from_slice(b"APT DC Driver");
    buf[84..86].copy_from_slice(&3u16.to_le_bytes());
    buf[88..90].copy_from_slice(&channel_count.to_le_bytes());
    buf
}

/// 12-byte `MOT_GET_POSCOUNTER` response.
pub fn position_frame(channel: u16, position: i32) -> Vec<u8> {
    let mut buf = vec![0x12, 0x04, 0x06, 0x00, 0x81, 0x50];
    buf.extend_from_slice(&channel.to_le_bytes());
    buf.extend_from_slice(&position.to_le_bytes());
    buf
}

/// 20-byte `MOT_GET_VELPARAMS` response.
pub fn velocity_frame(channel: u16, params: VelocityParams) -> Vec<u8> {
    let mut buf = vec![0x15, 0x04, 0x0E, 0x00, 0x81, 0x50];
    buf.extend_from_slice(&channel.to_le_bytes());
    buf.extend_from_slice(&params.min_vel.to_le_bytes());
    buf.extend_from_slice(&params.accel.to_le_bytes());
    buf.extend_from_slice(&params.max_vel.to_le_bytes());
    buf
}

/// 80-byte `MOT_GET_PMDSTAGEAXISPARAMS` response.
pub fn stage_frame(channel: u16, counts_per_unit: u32, min_pos: i32, max_pos: i32) -> Vec<u8> {
    let mut buf = vec![0u8; 80];
    buf[..6].copy_from_slice(&[0xF2, 0x04, 0x4A, 0x00, 0x81, 0x50]);
    buf[6..8].copy_from_slice(&channel.to_le_bytes());
    buf[8..10].copy_from_slice(&7u16.to_le_bytes());
    buf[10..12].copy_from_slice(&channel.to_le_bytes());
    buf[12..17].copy_from_slice(b"MTS50");
    buf[28..32].copy_from_slice(&123_456u32.to_le_bytes());
    buf[32..36].copy_from_slice(&counts_per_unit.to_le_bytes());
    buf[36..40].copy_from_slice(&min_pos.to_le_bytes());
    buf[40..44].copy_from_slice(&max_pos.to_le_bytes());
    buf[44..48].copy_from_slice(&1_000i32.to_le_bytes());
    buf[48..52].copy_from_slice(&1_000i32.to_le_bytes());
    buf[52..56].copy_from_slice(&5_000i32.to_le_bytes());
    buf
}

/// 6-byte completion frame such as `MOT_MOVE_HOMED` or `MOT_MOVE_COMPLETED`.
pub fn completion_frame(message_id: u16, channel: u8) -> Vec<u8> {
    let id = message_id.to_le_bytes();
    vec![id[0], id[1], channel, 0x00, 0x01, 0x50]
}

/// An initialized service over mock controllers.
pub struct Harness {
    pub service: AptService<MockTransport>,
    pub transport: MockTransport,
    pub sleeper: Arc<RecordingSleeper>,
    pub ports: Vec<MockSerialPort>,
}

impl Harness {
    /// One mock controller per serial string, on `/dev/ttyUSB<n>`.
    pub fn new(serials: &[&str]) -> Self {
        Self::with_config(serials, Config::default())
    }

    pub fn with_config(serials: &[&str], config: Config) -> Self {
        let transport = MockTransport::new();
        let ports = serials
            .iter()
            .enumerate()
            .map(|(i, sn)| transport.add_device(&format!("/dev/ttyUSB{i}"), sn))
            .collect();
        let sleeper = Arc::new(RecordingSleeper::new());
        let service = AptService::with_sleeper(transport.clone(), config, sleeper.clone());
        service.initialize().expect("mock controllers enumerate");
        Self {
            service,
            transport,
            sleeper,
            ports,
        }
    }

    pub fn port(&mut self, index: usize) -> &mut MockSerialPort {
        &mut self.ports[index]
    }

    /// Script an identity reply and read it, so channels can be selected.
    pub fn identify_as(&mut self, index: usize, serial: u32, model: &str, channels: u16) {
        self.ports[index].enqueue_reply(&identity_frame(serial, model, channels));
        self.service
            .query_info(serial)
            .expect("identity query succeeds");
        self.ports[index].clear_write_log();
    }
}
