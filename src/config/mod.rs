// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the line monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `line`: Identity of the monitored line
//! - `modbus`: Counter device address and register map
//! - `shifts`: Shift windows
//! - `production`: Planned production targets for OEE
//! - `monitoring`: Poll cadence, downtime threshold and error backoff
//!
//! ## Usage
//!
//! ```no_run
//! use line_oee_monitor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("192.168.1.20".to_string()), // Modbus host
//!     Some(502),                        // Modbus port
//!     None,                             // Device id
//!     Some(1000),                       // Poll interval (ms)
//!     None,                             // Downtime threshold (s)
//! );
//!
//! println!("Polling {} every {} ms", config.modbus.socket_address(), config.monitoring.poll_interval_ms);
//! ```

pub mod modbus;
pub mod monitoring;
pub mod production;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::production::shift::{default_shifts, ShiftDefinition};

pub use modbus::{ModbusConfig, RegisterMap};
pub use monitoring::MonitoringConfig;
pub use production::{LineConfig, ProductionConfig};
pub use utils::{is_valid_ip_address, output_config_schema};

/// JSON schema the YAML configuration is validated against
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure of the line monitor.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity of the monitored line.
    #[serde(default)]
    pub line: LineConfig,

    /// Counter device settings.
    ///
    /// Address, unit id, timeout and the input registers holding the
    /// line counters.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Shift windows, evaluated in order.
    #[serde(default = "default_shifts")]
    pub shifts: Vec<ShiftDefinition>,

    /// Planned production figures used by the OEE computation.
    #[serde(default)]
    pub production: ProductionConfig,

    /// Polling loop cadence and downtime threshold.
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            modbus: ModbusConfig::default(),
            shifts: default_shifts(),
            production: ProductionConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file failing schema
    /// validation, deserialization or the specific rules produces a
    /// `*.sample.yaml` file next to it and an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate this configuration against the specific rules
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the existing configuration.
    ///
    /// # Parameters
    ///
    /// * `modbus_host` - Address of the counter device
    /// * `modbus_port` - TCP port of the counter device
    /// * `device_id` - Modbus unit identifier
    /// * `poll_interval_ms` - Interval between two polling ticks
    /// * `downtime_threshold_secs` - Stall duration classified as downtime
    pub fn apply_args(
        &mut self,
        modbus_host: Option<String>,
        modbus_port: Option<u16>,
        device_id: Option<u8>,
        poll_interval_ms: Option<u64>,
        downtime_threshold_secs: Option<u64>,
    ) {
        if let Some(host) = modbus_host {
            debug!("Overriding Modbus host from command line: {}", host);
            self.modbus.host = host;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(device_id) = device_id {
            debug!("Overriding Modbus device id from command line: {}", device_id);
            self.modbus.device_id = device_id;
        }
        if let Some(interval) = poll_interval_ms {
            debug!("Overriding poll interval from command line: {} ms", interval);
            self.monitoring.poll_interval_ms = interval;
            // Keep the backoff at least as long as the regular cadence
            self.monitoring.error_backoff_ms = self.monitoring.error_backoff_ms.max(interval);
        }
        if let Some(threshold) = downtime_threshold_secs {
            debug!(
                "Overriding downtime threshold from command line: {} s",
                threshold
            );
            self.monitoring.downtime_threshold_secs = threshold;
        }
    }
}
