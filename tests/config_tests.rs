//! Configuration loading from files and the environment.

use apt_driver::config::{AbsoluteMoveId, ConfigError, ConfigLoader, DisableEncoding, LogFormat};
use apt_driver::port::FlowControl;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
#[serial]
fn test_load_from_file() {
    let file = write_config(
        r#"
        [serial]
        read_timeout_ms = 1500

        [protocol]
        settle_delay_ms = 200
        disable_encoding = "legacy"
        absolute_move_id = "distinct"
        query_stage_on_select = true

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    let loader = ConfigLoader::load_from(file.path()).unwrap();
    let config = loader.config();
    assert_eq!(loader.config_path.as_deref(), Some(file.path()));
    assert_eq!(config.serial.read_timeout_ms, 1500);
    assert_eq!(config.serial.baud_rate, 115_200);
    assert_eq!(config.protocol.settle_delay_ms, 200);
    assert_eq!(config.protocol.disable_encoding, DisableEncoding::Legacy);
    assert_eq!(config.protocol.absolute_move_id, AbsoluteMoveId::Distinct);
    assert!(config.protocol.query_stage_on_select);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
#[serial]
fn test_missing_file() {
    let err = ConfigLoader::load_from("/nonexistent/apt-driver.toml").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
#[serial]
fn test_malformed_file() {
    let file = write_config("[protocol]\npoll_attempts = \"many\"\n");
    let err = ConfigLoader::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));
}

#[test]
#[serial]
fn test_zero_poll_attempts_rejected() {
    let file = write_config("[protocol]\npoll_attempts = 0\n");
    assert!(matches!(
        ConfigLoader::load_from(file.path()),
        Err(ConfigError::OutOfRange {
            key: "protocol.poll_attempts",
            ..
        })
    ));
}

#[test]
#[serial]
fn test_env_path_and_overrides() {
    let file = write_config("[serial]\nbaud_rate = 57600\n");
    env::set_var("APT_DRIVER_CONFIG", file.path());
    env::set_var("APT_DRIVER_PROTOCOL_POLL_INTERVAL_MS", "75");

    let loader = ConfigLoader::load().unwrap();
    assert_eq!(loader.config_path.as_deref(), Some(file.path()));
    assert_eq!(loader.config().serial.baud_rate, 57600);
    assert_eq!(loader.config().protocol.poll_interval_ms, 75);

    env::remove_var("APT_DRIVER_CONFIG");
    env::remove_var("APT_DRIVER_PROTOCOL_POLL_INTERVAL_MS");
}

#[test]
#[serial]
fn test_env_override_validated() {
    let file = write_config("");
    env::set_var("APT_DRIVER_SERIAL_BAUD_RATE", "0");

    let result = ConfigLoader::load_from(file.path());

    env::remove_var("APT_DRIVER_SERIAL_BAUD_RATE");
    assert!(matches!(
        result,
        Err(ConfigError::OutOfRange {
            key: "serial.baud_rate",
            value: 0,
            ..
        })
    ));
}

#[test]
#[serial]
fn test_unknown_absolute_move_id_in_file() {
    let file = write_config("[protocol]\nabsolute_move_id = \"0x0453\"\n");
    assert!(matches!(
        ConfigLoader::load_from(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
#[serial]
fn test_delay_out_of_range() {
    let file = write_config("[protocol]\nsettle_delay_ms = 600000\n");
    let err = ConfigLoader::load_from(file.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "protocol.settle_delay_ms = 600000 is outside 0..=10000"
    );
}

#[test]
#[serial]
fn test_flow_control_from_file() {
    let file = write_config("[serial]\nflow_control = \"rts-cts\"\n");
    let config = ConfigLoader::load_from(file.path()).unwrap().into_config();
    assert_eq!(config.serial.flow_control, FlowControl::RtsCts);
    assert_eq!(
        config.serial.port_configuration().flow_control,
        FlowControl::RtsCts
    );
}

#[test]
#[serial]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut loader = ConfigLoader::with_defaults();
    loader.config.protocol.poll_attempts = 12;
    loader.save_to(&path).unwrap();

    let reloaded = ConfigLoader::load_from(&path).unwrap();
    assert_eq!(reloaded.config().protocol.poll_attempts, 12);
    assert_eq!(reloaded.config().serial, loader.config().serial);
}
