// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Downtime detection
//!
//! The detector tracks the last counter value that showed production and
//! classifies the line as running or stalled:
//!
//! - The first reading only seeds the baseline.
//! - A higher count means production advanced: the line is running again,
//!   any open stall and its reason are cleared and the baseline moves.
//! - An unchanged (or lower) count is a stall candidate. Once the time since
//!   the baseline reaches the threshold the stall becomes downtime, starting
//!   at the baseline time, and is reported on every check until production
//!   resumes.
//!
//! The baseline is frozen while stalled so the reported duration keeps
//! growing from the last productive reading.

use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::reasons::DowntimeReason;

/// Default stall duration classified as downtime
pub const DEFAULT_DOWNTIME_THRESHOLD: Duration = Duration::from_secs(180);

/// An ongoing downtime period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeEvent {
    /// Time of the last reading that showed production
    pub start_time: DateTime<Local>,
    /// Seconds elapsed since `start_time`
    pub duration_seconds: f64,
    pub reason: String,
}

/// Outcome of one downtime check
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DowntimeStatus {
    pub is_downtime: bool,
    pub info: Option<DowntimeEvent>,
}

impl DowntimeStatus {
    pub fn running() -> Self {
        Self::default()
    }

    pub fn stalled(event: DowntimeEvent) -> Self {
        Self {
            is_downtime: true,
            info: Some(event),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DowntimeState {
    last_count: Option<u32>,
    last_time: Option<DateTime<Local>>,
    downtime_start: Option<DateTime<Local>>,
    current_reason: Option<String>,
}

/// Stateful running/stalled classifier fed once per poll tick
#[derive(Debug, Clone)]
pub struct DowntimeDetector {
    threshold: TimeDelta,
    state: DowntimeState,
}

impl DowntimeDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold: TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX),
            state: DowntimeState::default(),
        }
    }

    /// Classify the line given the current total counter.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Local, TimeDelta};
    /// use line_oee_monitor::production::downtime::DowntimeDetector;
    /// use std::time::Duration;
    ///
    /// let mut detector = DowntimeDetector::new(Duration::from_secs(180));
    /// let t0 = Local::now();
    /// assert!(!detector.check_downtime(1000, t0).is_downtime);
    /// assert!(detector.check_downtime(1000, t0 + TimeDelta::seconds(180)).is_downtime);
    /// assert!(!detector.check_downtime(1001, t0 + TimeDelta::seconds(183)).is_downtime);
    /// ```
    pub fn check_downtime(&mut self, current_count: u32, timestamp: DateTime<Local>) -> DowntimeStatus {
        let (last_count, last_time) = match (self.state.last_count, self.state.last_time) {
            (Some(count), Some(time)) => (count, time),
            _ => {
                debug!("Downtime baseline seeded at count {}", current_count);
                self.state.last_count = Some(current_count);
                self.state.last_time = Some(timestamp);
                return DowntimeStatus::running();
            }
        };

        if current_count > last_count {
            if let Some(start) = self.state.downtime_start {
                info!(
                    "Production resumed at count {} after {:.0} s of downtime",
                    current_count,
                    seconds_between(start, timestamp)
                );
            }
            self.state = DowntimeState {
                last_count: Some(current_count),
                last_time: Some(timestamp),
                downtime_start: None,
                current_reason: None,
            };
            return DowntimeStatus::running();
        }

        if timestamp - last_time < self.threshold {
            return DowntimeStatus::running();
        }

        let start = match self.state.downtime_start {
            Some(start) => start,
            None => {
                info!(
                    "Downtime detected: counter stuck at {} since {}",
                    last_count, last_time
                );
                self.state.downtime_start = Some(last_time);
                last_time
            }
        };
        let reason = self
            .state
            .current_reason
            .get_or_insert_with(|| DowntimeReason::AutoDetected.label().to_string())
            .clone();

        DowntimeStatus::stalled(DowntimeEvent {
            start_time: start,
            duration_seconds: seconds_between(start, timestamp),
            reason,
        })
    }

    /// Override the reason of the in-progress or next detected stall.
    ///
    /// This never opens or closes a downtime period by itself.
    pub fn add_downtime_reason(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!("Downtime reason set to '{}'", reason);
        self.state.current_reason = Some(reason);
    }

    pub fn is_stalled(&self) -> bool {
        self.state.downtime_start.is_some()
    }

    pub fn current_reason(&self) -> Option<&str> {
        self.state.current_reason.as_deref()
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }
}

impl Default for DowntimeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNTIME_THRESHOLD)
    }
}

fn seconds_between(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(t0: DateTime<Local>, seconds: i64) -> DateTime<Local> {
        t0 + TimeDelta::seconds(seconds)
    }

    #[test]
    fn test_first_check_seeds_baseline() {
        let mut detector = DowntimeDetector::default();
        let status = detector.check_downtime(1000, Local::now());
        assert_eq!(status, DowntimeStatus::running());
        assert!(!detector.is_stalled());
    }

    #[test]
    fn test_constant_count_reaches_threshold_exactly() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        detector.check_downtime(500, t0);
        assert!(!detector.check_downtime(500, at(t0, 179)).is_downtime);

        let status = detector.check_downtime(500, at(t0, 180));
        assert!(status.is_downtime);
        let event = status.info.unwrap();
        assert_eq!(event.start_time, t0);
        assert_relative_eq!(event.duration_seconds, 180.0);
        assert_eq!(event.reason, DowntimeReason::AutoDetected.label());
    }

    #[test]
    fn test_increasing_count_never_stalls() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        for step in 0..100u32 {
            // Large gaps between readings but the counter always advances
            let status = detector.check_downtime(step * 3, at(t0, step as i64 * 600));
            assert!(!status.is_downtime);
        }
    }

    #[test]
    fn test_higher_count_resets_immediately() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        detector.check_downtime(1000, t0);
        assert!(detector.check_downtime(1000, at(t0, 400)).is_downtime);
        assert!(detector.is_stalled());

        let status = detector.check_downtime(1001, at(t0, 403));
        assert!(!status.is_downtime);
        assert!(!detector.is_stalled());
        assert!(detector.current_reason().is_none());

        // New baseline: stalling again counts from the resume time
        assert!(!detector.check_downtime(1001, at(t0, 403 + 179)).is_downtime);
        let status = detector.check_downtime(1001, at(t0, 403 + 180));
        assert_eq!(status.info.unwrap().start_time, at(t0, 403));
    }

    #[test]
    fn test_duration_grows_from_frozen_baseline() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        detector.check_downtime(1000, t0);

        let first = detector.check_downtime(1000, at(t0, 190)).info.unwrap();
        let second = detector.check_downtime(1000, at(t0, 200)).info.unwrap();
        assert_relative_eq!(first.duration_seconds, 190.0);
        assert_relative_eq!(second.duration_seconds, 200.0);
        assert_eq!(first.start_time, second.start_time);
    }

    #[test]
    fn test_lower_count_is_not_production() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        detector.check_downtime(2_000_000, t0);
        assert!(!detector.check_downtime(100, at(t0, 60)).is_downtime);
        assert!(detector.check_downtime(150, at(t0, 200)).is_downtime);
    }

    #[test]
    fn test_manual_reason_overrides_default() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        detector.check_downtime(10, t0);
        assert!(detector.check_downtime(10, at(t0, 200)).is_downtime);

        detector.add_downtime_reason("Waiting for material");
        let event = detector.check_downtime(10, at(t0, 210)).info.unwrap();
        assert_eq!(event.reason, "Waiting for material");
    }

    #[test]
    fn test_reason_set_before_stall_is_kept() {
        let mut detector = DowntimeDetector::new(Duration::from_secs(180));
        let t0 = Local::now();
        detector.check_downtime(10, t0);
        detector.add_downtime_reason(DowntimeReason::Maintenance.label());
        assert!(!detector.is_stalled());

        let event = detector.check_downtime(10, at(t0, 300)).info.unwrap();
        assert_eq!(event.reason, DowntimeReason::Maintenance.label());
    }

    #[test]
    fn test_reason_does_not_open_stall() {
        let mut detector = DowntimeDetector::default();
        detector.add_downtime_reason("Cleaning");
        assert!(!detector.is_stalled());
        assert!(!detector.check_downtime(1, Local::now()).is_downtime);
    }
}
