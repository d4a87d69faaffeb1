// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Production line identity and target configuration
//!
//! This module defines the planned production figures the OEE computation is
//! measured against.

use serde::{Deserialize, Serialize};

/// Identity of the monitored production line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// Human-readable line name shown on dashboards
    pub name: String,
    /// Short line code attached to persisted records
    pub code: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            name: "Line 5".to_string(),
            code: "LINE_5".to_string(),
        }
    }
}

/// Planned production targets used by the OEE calculator.
///
/// # Fields
///
/// * `target_rate_per_hour` - Ideal production rate in units per hour
/// * `target_shift_production` - Planned units for a full shift
/// * `quality_rate` - Quality ratio assumed when no good-unit count is known
/// * `shift_duration_minutes` - Length of the shift window used by shift OEE
/// * `tick_window_minutes` - Synthetic operating/available window of the live per-tick OEE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    pub target_rate_per_hour: f64,

    pub target_shift_production: u32,

    /// Planned quality ratio in `(0, 1]`.
    pub quality_rate: f64,

    #[serde(default = "default_shift_duration_minutes")]
    pub shift_duration_minutes: f64,

    #[serde(default = "default_tick_window_minutes")]
    pub tick_window_minutes: f64,
}

fn default_shift_duration_minutes() -> f64 {
    12.0 * 60.0
}

fn default_tick_window_minutes() -> f64 {
    3.0
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            target_rate_per_hour: 1000.0,
            target_shift_production: 12000,
            quality_rate: 0.98,
            shift_duration_minutes: default_shift_duration_minutes(),
            tick_window_minutes: default_tick_window_minutes(),
        }
    }
}
