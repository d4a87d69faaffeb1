// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Line OEE monitor library
//!
//! Polls the production counters of a manufacturing line over Modbus TCP,
//! derives production deltas, detects downtime, computes OEE and publishes
//! the line state to the rest of the application.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration validated against a JSON schema
//! - [`modbus`]: counter device transport, register reader and simulator
//! - [`production`]: downtime detection, OEE, shifts and power
//! - [`storage`]: storage sink and its in-memory implementation
//! - [`daemon`]: polling loop, published snapshot and task management

pub mod config;
pub mod daemon;
pub mod error;
pub mod modbus;
pub mod production;
pub mod storage;

use serde::{Deserialize, Serialize};

use config::Config;

/// Static summary of the monitored line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub line_name: String,
    pub line_code: String,
    pub target_rate_per_hour: f64,
    pub target_shift_production: u32,
    pub shift_duration_minutes: f64,
    pub downtime_threshold_secs: u64,
    pub poll_interval_ms: u64,
}

impl SystemInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            line_name: config.line.name.clone(),
            line_code: config.line.code.clone(),
            target_rate_per_hour: config.production.target_rate_per_hour,
            target_shift_production: config.production.target_shift_production,
            shift_duration_minutes: config.production.shift_duration_minutes,
            downtime_threshold_secs: config.monitoring.downtime_threshold_secs,
            poll_interval_ms: config.monitoring.poll_interval_ms,
        }
    }
}
