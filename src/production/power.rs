// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Production power
//!
//! "Power" is the instantaneous production rate in units per hour, derived
//! from one tick's delta. The tracker keeps the highest value seen in each
//! minute and each hour of the current day.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ComputationFault;

/// Scale a tick's production delta to units per hour.
///
/// # Examples
///
/// ```
/// use line_oee_monitor::production::power::instantaneous_power;
/// use std::time::Duration;
///
/// // 3 units in 3 seconds is 3600 units per hour
/// let power = instantaneous_power(3, Duration::from_secs(3)).unwrap();
/// assert_eq!(power, 3600.0);
/// ```
pub fn instantaneous_power(delta: u32, interval: Duration) -> Result<f64, ComputationFault> {
    let seconds = interval.as_secs_f64();
    if seconds <= 0.0 {
        return Err(ComputationFault {
            operation: "instantaneous_power",
            reason: "poll interval is zero".to_string(),
        });
    }
    Ok(delta as f64 * 3600.0 / seconds)
}

/// Per-hour and per-minute power maxima of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerBuckets {
    /// 24 hourly maxima
    pub hourly: Vec<f64>,
    /// 24 x 60 minute maxima, indexed `[hour][minute]`
    pub minutes: Vec<Vec<f64>>,
}

impl PowerBuckets {
    pub fn new() -> Self {
        Self {
            hourly: vec![0.0; 24],
            minutes: vec![vec![0.0; 60]; 24],
        }
    }

    /// Keep `value` if it beats the current maxima. Out of range slots are ignored.
    pub fn record(&mut self, hour: u32, minute: u32, value: f64) {
        let (h, m) = (hour as usize, minute as usize);
        if h >= 24 || m >= 60 {
            return;
        }
        if value > self.hourly[h] {
            self.hourly[h] = value;
        }
        if value > self.minutes[h][m] {
            self.minutes[h][m] = value;
        }
    }

    pub fn hour_max(&self, hour: u32) -> f64 {
        self.hourly.get(hour as usize).copied().unwrap_or(0.0)
    }

    pub fn minute_max(&self, hour: u32, minute: u32) -> f64 {
        self.minutes
            .get(hour as usize)
            .and_then(|row| row.get(minute as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

impl Default for PowerBuckets {
    fn default() -> Self {
        Self::new()
    }
}

/// Current power and the maxima of the running minute and hour
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerSummary {
    pub current: f64,
    pub minute_max: f64,
    pub hour_max: f64,
}

/// Tracks power maxima for the current day, restarting at midnight
#[derive(Debug, Clone, Default)]
pub struct PowerTracker {
    date: Option<NaiveDate>,
    buckets: PowerBuckets,
}

impl PowerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: NaiveDateTime, value: f64) -> PowerSummary {
        let date = at.date();
        if self.date != Some(date) {
            if self.date.is_some() {
                debug!("New production day {}, resetting power maxima", date);
            }
            self.date = Some(date);
            self.buckets = PowerBuckets::new();
        }

        let (hour, minute) = (at.hour(), at.minute());
        self.buckets.record(hour, minute, value);

        PowerSummary {
            current: value,
            minute_max: self.buckets.minute_max(hour, minute),
            hour_max: self.buckets.hour_max(hour),
        }
    }

    pub fn buckets(&self) -> &PowerBuckets {
        &self.buckets
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}
