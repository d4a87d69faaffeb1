// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Counter readings and production deltas

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Counter values read from the line during one poll tick
///
/// Readings are immutable once produced. A reading with `success == false`
/// carries no counter data and only marks a tick where the device could not
/// be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterReading {
    /// Local time of the poll tick
    pub timestamp: DateTime<Local>,
    /// 32-bit total production counter
    pub ivams_total: u32,
    /// 16-bit hourly counter
    pub hour_count: u16,
    /// 16-bit auxiliary counter
    pub aux_count: u16,
    /// Whether the device answered this tick
    pub success: bool,
}

impl CounterReading {
    pub fn new(timestamp: DateTime<Local>, ivams_total: u32, hour_count: u16, aux_count: u16) -> Self {
        Self {
            timestamp,
            ivams_total,
            hour_count,
            aux_count,
            success: true,
        }
    }

    /// Placeholder reading for a tick where the device gave no data
    pub fn no_data(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            ivams_total: 0,
            hour_count: 0,
            aux_count: 0,
            success: false,
        }
    }
}

/// Units produced between two total counter values.
///
/// Never negative: a counter that went backwards (device reset, wrap) yields
/// zero rather than negative production. Without a previous value there is
/// nothing to compare against and the delta is zero as well.
///
/// # Examples
///
/// ```
/// use line_oee_monitor::production::reading::production_delta;
///
/// assert_eq!(production_delta(Some(1000), 1042), 42);
/// assert_eq!(production_delta(Some(2_000_000), 100), 0);
/// assert_eq!(production_delta(None, 1000), 0);
/// ```
pub fn production_delta(previous_total: Option<u32>, current_total: u32) -> u32 {
    previous_total
        .map(|previous| current_total.saturating_sub(previous))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_never_negative() {
        let sequences: [&[u32]; 4] = [
            &[0, 10, 20, 15, 30],
            &[2_000_000, 100, 150],
            &[u32::MAX, 0, 1],
            &[5, 5, 5],
        ];
        for totals in sequences {
            let mut previous = None;
            let mut sum = 0u64;
            for &total in totals {
                let delta = production_delta(previous, total);
                if let Some(prev) = previous {
                    if total < prev {
                        assert_eq!(delta, 0, "{} -> {} must clamp to zero", prev, total);
                    } else {
                        assert_eq!(delta, total - prev);
                    }
                }
                sum += delta as u64;
                previous = Some(total);
            }
            assert!(sum <= u32::MAX as u64);
        }
    }

    #[test]
    fn test_device_reset_yields_zero() {
        assert_eq!(production_delta(Some(2_000_000), 100), 0);
    }

    #[test]
    fn test_no_data_reading() {
        let now = Local::now();
        let reading = CounterReading::no_data(now);
        assert!(!reading.success);
        assert_eq!(reading.ivams_total, 0);
        assert_eq!(reading.timestamp, now);
        assert!(CounterReading::new(now, 1, 2, 3).success);
    }
}
