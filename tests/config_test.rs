// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use chrono::NaiveTime;
use line_oee_monitor::config::{self, Config};
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config::default();
    config.line.name = "Line 7".to_string();
    config.modbus.host = "192.168.1.20".to_string();
    config.modbus.port = 5020;
    config.monitoring.poll_interval_ms = 1000;
    config.monitoring.error_backoff_ms = 2000;

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;

    assert_eq!(loaded_config.line.name, "Line 7");
    assert_eq!(loaded_config.modbus.socket_address(), "192.168.1.20:5020");
    assert_eq!(loaded_config.monitoring.poll_interval_ms, 1000);
    assert_eq!(loaded_config.shifts, config.shifts);
    assert_eq!(loaded_config.modbus.registers.total_counter, 6000);

    // Loading a missing file writes the defaults
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;
    assert!(non_existent_path.exists());
    assert_eq!(default_config.modbus.device_id, 175);
    assert_eq!(default_config.monitoring.downtime_threshold_secs, 180);

    Ok(())
}

#[test]
fn test_minimal_config_uses_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("minimal.yaml");
    std::fs::write(
        &config_path,
        r#"
modbus:
  host: "127.0.0.1"
  port: 1502
  device_id: 1
shifts:
  - number: 1
    start: "06:00:00"
    end: "14:00:00"
  - number: 2
    start: "14:00"
    end: "22:00"
  - number: 3
    start: "22:00:00"
    end: "06:00:00"
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.modbus.timeout_ms, 5000);
    assert_eq!(config.shifts.len(), 3);
    assert!(config.shifts[2].is_overnight());
    assert_eq!(
        config.shifts[1].start,
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    );
    assert_eq!(config.production.target_rate_per_hour, 1000.0);

    Ok(())
}

#[test]
fn test_invalid_config_creates_sample() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("broken.yaml");
    std::fs::write(
        &config_path,
        r#"
modbus:
  host: "127.0.0.1"
  port: 0
  device_id: 1
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    assert!(temp_dir.path().join("broken.sample.yaml").exists());

    // A sample file is valid as is
    let sample = Config::from_file(temp_dir.path().join("broken.sample.yaml"))?;
    assert_eq!(sample.modbus.port, 502);

    Ok(())
}

#[test]
fn test_specific_rules_reject_schema_valid_file() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("backoff.yaml");
    std::fs::write(
        &config_path,
        r#"
monitoring:
  poll_interval_ms: 10000
  downtime_threshold_secs: 180
  error_backoff_ms: 5000
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("backoff"));

    Ok(())
}

#[test]
fn test_apply_args_overrides() {
    let mut config = Config::default();
    config.apply_args(
        Some("127.0.0.1".to_string()),
        Some(5020),
        Some(3),
        Some(8000),
        Some(60),
    );

    assert_eq!(config.modbus.socket_address(), "127.0.0.1:5020");
    assert_eq!(config.modbus.device_id, 3);
    assert_eq!(config.monitoring.poll_interval_ms, 8000);
    assert_eq!(config.monitoring.error_backoff_ms, 8000);
    assert_eq!(config.monitoring.downtime_threshold_secs, 60);
    assert!(config.validate().is_ok());

    // Nothing given, nothing changed
    let before = Config::default();
    let mut after = Config::default();
    after.apply_args(None, None, None, None, None);
    assert_eq!(after.modbus.socket_address(), before.modbus.socket_address());
}

#[test]
fn test_config_schema_output() -> Result<()> {
    config::output_config_schema()?;
    Ok(())
}
