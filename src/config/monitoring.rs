// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling loop configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cadence and thresholds of the polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Time interval in milliseconds between two polling ticks.
    ///
    /// Must be greater than zero.
    pub poll_interval_ms: u64,

    /// Minimum stall duration, in seconds, before a stall is classified as downtime.
    pub downtime_threshold_secs: u64,

    /// Sleep in milliseconds after a faulty tick before polling again.
    ///
    /// Must not be shorter than the poll interval.
    pub error_backoff_ms: u64,

    /// Interval in seconds between two heartbeat log lines of the daemon.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    60
}

impl MonitoringConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn downtime_threshold(&self) -> Duration {
        Duration::from_secs(self.downtime_threshold_secs)
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            downtime_threshold_secs: 180,
            error_backoff_ms: 5000,
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}
