// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};

/// Highest unit identifier addressable on a Modbus line
const MAX_MODBUS_DEVICE_ID: u8 = 247;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./line_oee_monitor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Device**: non-empty host, port in 1-65535, unit id in 0-247, non-zero timeout
/// - **Cadence**: poll interval greater than zero, error backoff not shorter than the poll interval
/// - **Targets**: positive target rate, quality rate in `(0, 1]`, positive shift and tick windows
/// - **Shifts**: at least one shift, unique shift numbers
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let modbus = &config.modbus;
    if modbus.host.trim().is_empty() {
        anyhow::bail!("Modbus host must not be empty");
    }
    if !is_valid_ip_address(&modbus.host) {
        // Hostnames are allowed, just note it
        debug!("Modbus host is not an IP address: {}", modbus.host);
    }
    if modbus.port == 0 {
        anyhow::bail!("Invalid Modbus port number: {}", modbus.port);
    }
    if modbus.device_id > MAX_MODBUS_DEVICE_ID {
        anyhow::bail!(
            "Invalid Modbus device id {}: must be between 0 and {}",
            modbus.device_id,
            MAX_MODBUS_DEVICE_ID
        );
    }
    if modbus.timeout_ms == 0 {
        anyhow::bail!("Modbus read timeout must be greater than zero");
    }

    let monitoring = &config.monitoring;
    if monitoring.poll_interval_ms == 0 {
        anyhow::bail!("Poll interval must be greater than zero");
    }
    if monitoring.error_backoff_ms < monitoring.poll_interval_ms {
        anyhow::bail!(
            "Error backoff ({} ms) must not be shorter than the poll interval ({} ms)",
            monitoring.error_backoff_ms,
            monitoring.poll_interval_ms
        );
    }

    let production = &config.production;
    if !(production.target_rate_per_hour > 0.0) {
        anyhow::bail!(
            "Target production rate must be positive, got {}",
            production.target_rate_per_hour
        );
    }
    if !(production.quality_rate > 0.0 && production.quality_rate <= 1.0) {
        anyhow::bail!(
            "Quality rate must be in (0, 1], got {}",
            production.quality_rate
        );
    }
    if !(production.shift_duration_minutes > 0.0) || !(production.tick_window_minutes > 0.0) {
        anyhow::bail!("Shift duration and per-tick OEE window must be positive");
    }

    if config.shifts.is_empty() {
        anyhow::bail!("At least one shift must be configured");
    }
    let mut numbers = HashSet::new();
    for shift in &config.shifts {
        if !numbers.insert(shift.number) {
            anyhow::bail!("Duplicate shift number: {}", shift.number);
        }
    }

    Ok(())
}
