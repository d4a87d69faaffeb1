// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Overall Equipment Effectiveness
//!
//! OEE is the product of three ratios, each clamped to `[0, 1]`:
//!
//! - availability: operating time over available time
//! - performance: actual production over the ideal production for the
//!   operating time at the target rate
//! - quality: good units over actual units, or the configured quality rate
//!   when no good-unit count is known
//!
//! Results are expressed as percentages rounded to two decimals. The
//! computation never fails: a non-finite intermediate yields a zeroed
//! result that still echoes its inputs.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::ProductionConfig;
use crate::error::ComputationFault;

/// Outcome of an OEE computation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OeeResult {
    /// OEE in percent
    pub oee_percentage: f64,
    /// Availability in percent
    pub availability: f64,
    /// Performance in percent
    pub performance: f64,
    /// Quality in percent
    pub quality: f64,
    /// Units per hour of operating time
    pub production_rate: f64,
    pub actual_production: u64,
    pub planned_production: f64,
    /// Minutes the line was producing
    pub operating_time: f64,
    /// Minutes the line could have produced
    pub available_time: f64,
}

impl OeeResult {
    /// All ratios at zero, inputs echoed
    pub fn zeroed(
        actual_production: u64,
        planned_production: f64,
        operating_time: f64,
        available_time: f64,
    ) -> Self {
        Self {
            actual_production,
            planned_production,
            operating_time,
            available_time,
            ..Self::default()
        }
    }
}

/// Production figures aggregated over one shift
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShiftData {
    pub total_production: u64,
    /// Number of readings inside the shift window
    pub data_points: usize,
    pub downtime_minutes: f64,
}

/// Computes OEE against the planned production targets
#[derive(Debug, Clone, PartialEq)]
pub struct OeeCalculator {
    target_rate_per_hour: f64,
    target_shift_production: u32,
    quality_rate: f64,
    shift_duration_minutes: f64,
    tick_window_minutes: f64,
}

impl OeeCalculator {
    pub fn new(target_rate_per_hour: f64, target_shift_production: u32, quality_rate: f64) -> Self {
        let defaults = ProductionConfig::default();
        Self {
            target_rate_per_hour,
            target_shift_production,
            quality_rate,
            shift_duration_minutes: defaults.shift_duration_minutes,
            tick_window_minutes: defaults.tick_window_minutes,
        }
    }

    pub fn from_config(config: &ProductionConfig) -> Self {
        Self {
            target_rate_per_hour: config.target_rate_per_hour,
            target_shift_production: config.target_shift_production,
            quality_rate: config.quality_rate,
            shift_duration_minutes: config.shift_duration_minutes,
            tick_window_minutes: config.tick_window_minutes,
        }
    }

    pub fn target_rate_per_hour(&self) -> f64 {
        self.target_rate_per_hour
    }

    /// Compute OEE from raw production figures.
    ///
    /// `operating_time` and `available_time` are in minutes. Without
    /// `good_units` (or without production) the configured quality rate
    /// is used.
    ///
    /// # Examples
    ///
    /// ```
    /// use line_oee_monitor::production::oee::OeeCalculator;
    ///
    /// let calculator = OeeCalculator::new(1000.0, 12000, 0.98);
    /// let result = calculator.calculate_oee(11000, 12000.0, 700.0, 720.0, None);
    /// assert_eq!(result.quality, 98.0);
    /// assert!(result.oee_percentage <= 100.0);
    /// ```
    pub fn calculate_oee(
        &self,
        actual_production: u64,
        planned_production: f64,
        operating_time: f64,
        available_time: f64,
        good_units: Option<u64>,
    ) -> OeeResult {
        match self.try_calculate(
            actual_production,
            planned_production,
            operating_time,
            available_time,
            good_units,
        ) {
            Ok(result) => result,
            Err(fault) => {
                warn!("{}, returning zeroed OEE", fault);
                OeeResult::zeroed(
                    actual_production,
                    planned_production,
                    operating_time,
                    available_time,
                )
            }
        }
    }

    fn try_calculate(
        &self,
        actual_production: u64,
        planned_production: f64,
        operating_time: f64,
        available_time: f64,
        good_units: Option<u64>,
    ) -> Result<OeeResult, ComputationFault> {
        for (name, value) in [
            ("operating_time", operating_time),
            ("available_time", available_time),
            ("target_rate_per_hour", self.target_rate_per_hour),
            ("quality_rate", self.quality_rate),
        ] {
            if !value.is_finite() {
                return Err(ComputationFault {
                    operation: "calculate_oee",
                    reason: format!("{} is not finite ({})", name, value),
                });
            }
        }

        let actual = actual_production as f64;

        let availability = if available_time > 0.0 {
            (operating_time / available_time).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let ideal_production = self.target_rate_per_hour / 60.0 * operating_time;
        let performance = if ideal_production > 0.0 {
            (actual / ideal_production).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let quality = match good_units {
            Some(good) if actual_production > 0 => (good as f64 / actual).clamp(0.0, 1.0),
            _ => self.quality_rate.clamp(0.0, 1.0),
        };

        let oee = availability * performance * quality;
        let production_rate = if operating_time > 0.0 {
            actual / operating_time * 60.0
        } else {
            0.0
        };

        if !oee.is_finite() || !production_rate.is_finite() {
            return Err(ComputationFault {
                operation: "calculate_oee",
                reason: "non-finite ratio".to_string(),
            });
        }

        Ok(OeeResult {
            oee_percentage: round2(oee * 100.0),
            availability: round2(availability * 100.0),
            performance: round2(performance * 100.0),
            quality: round2(quality * 100.0),
            production_rate: round2(production_rate),
            actual_production,
            planned_production,
            operating_time,
            available_time,
        })
    }

    /// OEE over a full shift window, with recorded downtime removed from
    /// the operating time
    pub fn calculate_shift_oee(&self, shift: &ShiftData) -> OeeResult {
        let operating_time = (self.shift_duration_minutes - shift.downtime_minutes).max(0.0);
        self.calculate_oee(
            shift.total_production,
            self.target_shift_production as f64,
            operating_time,
            self.shift_duration_minutes,
            None,
        )
    }

    /// Live estimate from a single tick's production delta.
    ///
    /// The delta is evaluated against a fixed synthetic window of
    /// `tick_window_minutes` (operating = available), independent of the
    /// actual poll interval.
    pub fn calculate_tick_oee(&self, delta: u32) -> OeeResult {
        let window = self.tick_window_minutes;
        let planned = self.target_rate_per_hour * window / 60.0;
        self.calculate_oee(delta as u64, planned, window, window, None)
    }
}

impl Default for OeeCalculator {
    fn default() -> Self {
        Self::from_config(&ProductionConfig::default())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn calculator() -> OeeCalculator {
        OeeCalculator::new(1000.0, 12000, 0.98)
    }

    #[test]
    fn test_percentages_are_bounded() {
        let calc = calculator();
        let cases = [
            (0u64, 0.0, 0.0, 0.0, None),
            (50_000, 12000.0, 720.0, 720.0, None),
            (100, 50.0, 900.0, 720.0, Some(500)),
            (100, 50.0, -10.0, 720.0, Some(90)),
            (0, 50.0, 3.0, 3.0, Some(10)),
        ];
        for (actual, planned, operating, available, good) in cases {
            let r = calc.calculate_oee(actual, planned, operating, available, good);
            for value in [r.oee_percentage, r.availability, r.performance, r.quality] {
                assert!((0.0..=100.0).contains(&value), "{:?}", r);
            }
        }
    }

    #[test]
    fn test_zero_operating_time() {
        let r = calculator().calculate_oee(100, 50.0, 0.0, 720.0, None);
        assert_eq!(r.availability, 0.0);
        assert_eq!(r.production_rate, 0.0);
        assert_eq!(r.performance, 0.0);
        assert_eq!(r.oee_percentage, 0.0);
    }

    #[test]
    fn test_good_units_drive_quality() {
        let r = calculator().calculate_oee(200, 200.0, 12.0, 12.0, Some(150));
        assert_relative_eq!(r.quality, 75.0);
        assert_relative_eq!(r.availability, 100.0);
        assert_relative_eq!(r.performance, 100.0);
        assert_relative_eq!(r.oee_percentage, 75.0);
        assert_relative_eq!(r.production_rate, 1000.0);
    }

    #[test]
    fn test_deterministic() {
        let calc = calculator();
        let a = calc.calculate_oee(1234, 1000.0, 71.3, 72.0, Some(1200));
        let b = calc.calculate_oee(1234, 1000.0, 71.3, 72.0, Some(1200));
        assert_eq!(a, b);
        assert_eq!(a.oee_percentage.to_bits(), b.oee_percentage.to_bits());
    }

    #[test]
    fn test_non_finite_inputs_zero_the_result() {
        let r = calculator().calculate_oee(10, 50.0, f64::NAN, 3.0, None);
        assert_eq!(r.oee_percentage, 0.0);
        assert_eq!(r.quality, 0.0);
        assert_eq!(r.actual_production, 10);
        assert!(r.operating_time.is_nan());

        let broken = OeeCalculator::new(f64::INFINITY, 12000, 0.98);
        assert_eq!(broken.calculate_oee(10, 50.0, 3.0, 3.0, None).oee_percentage, 0.0);
    }

    #[test]
    fn test_shift_oee() {
        let calc = calculator();
        let shift = ShiftData {
            total_production: 9000,
            data_points: 14_400,
            downtime_minutes: 90.0,
        };
        let r = calc.calculate_shift_oee(&shift);
        assert_relative_eq!(r.operating_time, 630.0);
        assert_relative_eq!(r.available_time, 720.0);
        assert_relative_eq!(r.planned_production, 12000.0);
        assert_relative_eq!(r.availability, 87.5);
        // Ideal for 630 minutes at 1000/h is 10500 units
        assert_relative_eq!(r.performance, 85.71);
        assert_relative_eq!(r.quality, 98.0);

        // More downtime than the shift lasts never goes negative
        let idle = ShiftData {
            downtime_minutes: 800.0,
            ..shift
        };
        assert_eq!(calc.calculate_shift_oee(&idle).availability, 0.0);
    }

    #[test]
    fn test_tick_oee_uses_synthetic_window() {
        let r = calculator().calculate_tick_oee(50);
        assert_relative_eq!(r.planned_production, 50.0);
        assert_relative_eq!(r.operating_time, 3.0);
        assert_relative_eq!(r.available_time, 3.0);
        assert_relative_eq!(r.performance, 100.0);
        assert_relative_eq!(r.oee_percentage, 98.0);

        let stalled = calculator().calculate_tick_oee(0);
        assert_eq!(stalled.performance, 0.0);
        assert_eq!(stalled.oee_percentage, 0.0);
    }
}
