//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section is optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use super::error::{ConfigError, ConfigResult};
use crate::port::{FlowControl, PortConfiguration, APT_PRODUCT_ID, APT_VENDOR_ID};
use crate::protocol::ids::{
    CHANNEL_DISABLE, CHANNEL_DISABLE_LEGACY, MOT_MOVE_ABSOLUTE, MOT_MOVE_ABSOLUTE_SHARED,
};

/// The FTDI bridge tops out at 3 Mbaud.
const BAUD_RATES: RangeInclusive<u64> = 1..=3_000_000;
const TIMEOUTS_MS: RangeInclusive<u64> = 1..=60_000;
const DELAYS_MS: RangeInclusive<u64> = 0..=10_000;
const POLL_ATTEMPTS: RangeInclusive<u64> = 1..=1_000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line and USB matching
    pub serial: SerialConfig,
    /// APT exchange timing and encoding choices
    pub protocol: ProtocolConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject rates, timeouts, delays and poll counts the driver cannot use.
    pub fn validate(&self) -> ConfigResult<()> {
        let serial = &self.serial;
        let protocol = &self.protocol;
        ConfigError::check_range("serial.baud_rate", serial.baud_rate.into(), BAUD_RATES)?;
        ConfigError::check_range("serial.read_timeout_ms", serial.read_timeout_ms, TIMEOUTS_MS)?;
        ConfigError::check_range(
            "serial.write_timeout_ms",
            serial.write_timeout_ms,
            TIMEOUTS_MS,
        )?;
        ConfigError::check_range(
            "protocol.settle_delay_ms",
            protocol.settle_delay_ms,
            DELAYS_MS,
        )?;
        ConfigError::check_range(
            "protocol.poll_interval_ms",
            protocol.poll_interval_ms,
            DELAYS_MS,
        )?;
        ConfigError::check_range(
            "protocol.poll_attempts",
            protocol.poll_attempts.into(),
            POLL_ATTEMPTS,
        )
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Line rate; APT controllers run at 115200
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Write timeout in milliseconds
    pub write_timeout_ms: u64,
    /// USB vendor id to enumerate
    pub vendor_id: u16,
    /// USB product id to enumerate
    pub product_id: u16,
    /// `"none"` or `"rts-cts"`
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout_ms: 3000,
            write_timeout_ms: 3000,
            vendor_id: APT_VENDOR_ID,
            product_id: APT_PRODUCT_ID,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Line settings applied to every opened port.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            flow_control: self.flow_control,
            read_timeout: self.read_timeout(),
            write_timeout: self.write_timeout(),
        }
    }
}

/// Protocol configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Pause between writing a request and reading its response
    pub settle_delay_ms: u64,
    /// Reads made while waiting for a motion completion
    pub poll_attempts: u32,
    /// Pause between completion reads
    pub poll_interval_ms: u64,
    /// Byte written to disable a channel
    pub disable_encoding: DisableEncoding,
    /// Message id used for absolute moves
    pub absolute_move_id: AbsoluteMoveId,
    /// Fetch stage parameters whenever a channel is selected
    pub query_stage_on_select: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 150,
            poll_attempts: 10,
            poll_interval_ms: 150,
            disable_encoding: DisableEncoding::default(),
            absolute_move_id: AbsoluteMoveId::default(),
            query_stage_on_select: false,
        }
    }
}

impl ProtocolConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Encoding of the "disabled" channel state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisableEncoding {
    /// `0x02`, as documented for `MOD_SET_CHANENABLESTATE`
    #[default]
    Standard,
    /// `0x00`, as some older host software sends
    Legacy,
}

impl DisableEncoding {
    pub fn byte(self) -> u8 {
        match self {
            Self::Standard => CHANNEL_DISABLE,
            Self::Legacy => CHANNEL_DISABLE_LEGACY,
        }
    }
}

impl FromStr for DisableEncoding {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "legacy" => Ok(Self::Legacy),
            _ => Err("standard, legacy"),
        }
    }
}

/// Which message id carries absolute moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsoluteMoveId {
    /// `0x0448`, shared with relative moves
    #[default]
    Shared,
    /// `0x0453`, `MOT_MOVE_ABSOLUTE`
    Distinct,
}

impl AbsoluteMoveId {
    pub fn message_id(self) -> u16 {
        match self {
            Self::Shared => MOT_MOVE_ABSOLUTE_SHARED,
            Self::Distinct => MOT_MOVE_ABSOLUTE,
        }
    }
}

impl FromStr for AbsoluteMoveId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Self::Shared),
            "distinct" => Ok(Self::Distinct),
            _ => Err("shared, distinct"),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err("json, pretty, compact"),
        }
    }
}
