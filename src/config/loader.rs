//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "APT_DRIVER";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file name in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "apt-driver.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "APT_DRIVER_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `APT_DRIVER_CONFIG` environment variable (explicit path)
    /// 2. `./apt-driver.toml` (current directory)
    /// 3. `apt-driver/config.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, no environment).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    get_default_config_path().filter(|path| path.exists())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "apt-driver").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Value of `APT_DRIVER_<key>`, trimmed, when it is set.
fn env_value(key: &str) -> Option<(String, String)> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    let value = std::env::var(&var).ok()?;
    Some((var, value.trim().to_string()))
}

/// Parse a numeric `APT_DRIVER_<key>` into `target` when it is set.
fn override_number<T: FromStr>(key: &str, target: &mut T) -> ConfigResult<()> {
    if let Some((var, value)) = env_value(key) {
        *target = value
            .parse()
            .map_err(|_| ConfigError::NotANumber { var, value })?;
    }
    Ok(())
}

/// Parse a named choice such as `shared`/`distinct` into `target` when set.
fn override_choice<T>(key: &str, target: &mut T) -> ConfigResult<()>
where
    T: FromStr<Err = &'static str>,
{
    if let Some((var, value)) = env_value(key) {
        *target = value
            .parse()
            .map_err(|expected| ConfigError::UnknownChoice {
                source_name: var,
                value,
                expected,
            })?;
    }
    Ok(())
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `APT_DRIVER_<SECTION>_<KEY>`
/// For example:
/// - `APT_DRIVER_SERIAL_BAUD_RATE=115200`
/// - `APT_DRIVER_PROTOCOL_POLL_ATTEMPTS=20`
/// - `APT_DRIVER_PROTOCOL_ABSOLUTE_MOVE_ID=distinct`
/// - `APT_DRIVER_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    let serial = &mut config.serial;
    override_number("SERIAL_BAUD_RATE", &mut serial.baud_rate)?;
    override_number("SERIAL_READ_TIMEOUT_MS", &mut serial.read_timeout_ms)?;
    override_number("SERIAL_WRITE_TIMEOUT_MS", &mut serial.write_timeout_ms)?;

    let protocol = &mut config.protocol;
    override_number("PROTOCOL_SETTLE_DELAY_MS", &mut protocol.settle_delay_ms)?;
    override_number("PROTOCOL_POLL_ATTEMPTS", &mut protocol.poll_attempts)?;
    override_number("PROTOCOL_POLL_INTERVAL_MS", &mut protocol.poll_interval_ms)?;
    override_choice("PROTOCOL_DISABLE_ENCODING", &mut protocol.disable_encoding)?;
    override_choice("PROTOCOL_ABSOLUTE_MOVE_ID", &mut protocol.absolute_move_id)?;

    if let Some((_, level)) = env_value("LOGGING_LEVEL") {
        config.logging.level = level;
    }
    override_choice("LOGGING_FORMAT", &mut config.logging.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AbsoluteMoveId, DisableEncoding, LogFormat};
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.baud_rate, 115_200);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("APT_DRIVER_PROTOCOL_POLL_ATTEMPTS", "25");
        env::set_var("APT_DRIVER_LOGGING_LEVEL", "debug");

        let mut config = Config::default();
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.protocol.poll_attempts, 25);
        assert_eq!(config.logging.level, "debug");

        env::remove_var("APT_DRIVER_PROTOCOL_POLL_ATTEMPTS");
        env::remove_var("APT_DRIVER_LOGGING_LEVEL");
    }

    #[test]
    #[serial]
    fn test_malformed_env_override() {
        env::set_var("APT_DRIVER_SERIAL_BAUD_RATE", "fast");

        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        env::remove_var("APT_DRIVER_SERIAL_BAUD_RATE");
        assert!(matches!(
            err,
            ConfigError::NotANumber { ref var, ref value }
                if var == "APT_DRIVER_SERIAL_BAUD_RATE" && value == "fast"
        ));
    }

    #[test]
    #[serial]
    fn test_choice_overrides() {
        env::set_var("APT_DRIVER_PROTOCOL_ABSOLUTE_MOVE_ID", "distinct");
        env::set_var("APT_DRIVER_PROTOCOL_DISABLE_ENCODING", " legacy ");
        env::set_var("APT_DRIVER_LOGGING_FORMAT", "json");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);

        env::remove_var("APT_DRIVER_PROTOCOL_ABSOLUTE_MOVE_ID");
        env::remove_var("APT_DRIVER_PROTOCOL_DISABLE_ENCODING");
        env::remove_var("APT_DRIVER_LOGGING_FORMAT");
        result.unwrap();
        assert_eq!(config.protocol.absolute_move_id, AbsoluteMoveId::Distinct);
        assert_eq!(config.protocol.disable_encoding, DisableEncoding::Legacy);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_unknown_absolute_move_id() {
        env::set_var("APT_DRIVER_PROTOCOL_ABSOLUTE_MOVE_ID", "0x0453");

        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();

        env::remove_var("APT_DRIVER_PROTOCOL_ABSOLUTE_MOVE_ID");
        assert!(matches!(
            err,
            ConfigError::UnknownChoice { ref value, expected: "shared, distinct", .. }
                if value == "0x0453"
        ));
        assert_eq!(config.protocol.absolute_move_id, AbsoluteMoveId::Shared);
    }

    #[test]
    fn test_default_config_path_name() {
        if let Some(path) = get_default_config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
