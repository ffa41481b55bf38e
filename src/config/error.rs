//! Failures while locating, reading, checking or saving driver configuration.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("no configuration file at {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the driver schema.
    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A delay, timeout, rate or poll count the driver cannot work with.
    #[error("{key} = {value} is outside {}..={}", range.start(), range.end())]
    OutOfRange {
        key: &'static str,
        value: u64,
        range: RangeInclusive<u64>,
    },

    /// A named setting such as `absolute_move_id` got a value it does not know.
    #[error("{source_name} = {value:?} is not one of {expected}")]
    UnknownChoice {
        source_name: String,
        value: String,
        expected: &'static str,
    },

    /// A numeric environment override did not parse.
    #[error("{var} = {value:?} is not a number")]
    NotANumber { var: String, value: String },
}

impl ConfigError {
    /// Fail unless `value` lies in `range`.
    pub(crate) fn check_range(
        key: &'static str,
        value: u64,
        range: RangeInclusive<u64>,
    ) -> ConfigResult<()> {
        if range.contains(&value) {
            Ok(())
        } else {
            Err(Self::OutOfRange { key, value, range })
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
