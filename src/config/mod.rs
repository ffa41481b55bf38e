//! Configuration module for the APT driver.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `APT_DRIVER_CONFIG` environment variable (explicit path)
//! 2. `./apt-driver.toml` (current directory)
//! 3. `~/.config/apt-driver/config.toml` (or the platform equivalent)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Timing, encoding and logging settings can be overridden via environment
//! variables. The pattern is: `APT_DRIVER_<SECTION>_<KEY>`
//!
//! Examples:
//! - `APT_DRIVER_SERIAL_READ_TIMEOUT_MS=5000`
//! - `APT_DRIVER_PROTOCOL_SETTLE_DELAY_MS=200`
//! - `APT_DRIVER_PROTOCOL_DISABLE_ENCODING=legacy`
//! - `APT_DRIVER_LOGGING_LEVEL=debug`
//!
//! The merged result is range-checked before it is handed out.
//!
//! # Example
//!
//! ```rust,no_run
//! use apt_driver::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Baud rate: {}", config.serial.baud_rate);
//! println!("Poll attempts: {}", config.protocol.poll_attempts);
//! # Ok::<(), apt_driver::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    AbsoluteMoveId, Config, DisableEncoding, LogFormat, LoggingConfig, ProtocolConfig,
    SerialConfig,
};
