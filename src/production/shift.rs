// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shift resolution
//!
//! Maps wall-clock time to the configured shift. A shift whose start is
//! later in the day than its end runs overnight and wraps past midnight.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// A recurring time-of-day window assigned a sequential number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    /// Sequential shift number
    pub number: u8,
    /// Start time of day (inclusive)
    pub start: NaiveTime,
    /// End time of day (exclusive)
    pub end: NaiveTime,
}

impl ShiftDefinition {
    pub fn new(number: u8, start: NaiveTime, end: NaiveTime) -> Self {
        Self { number, start, end }
    }

    /// Whether the shift wraps past midnight
    pub fn is_overnight(&self) -> bool {
        self.start > self.end
    }

    /// Whether `time` falls inside the shift window
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Length of the shift window.
    ///
    /// A shift whose start equals its end covers the whole day.
    pub fn duration(&self) -> TimeDelta {
        if self.start < self.end {
            self.end - self.start
        } else {
            TimeDelta::hours(24) - (self.start - self.end)
        }
    }
}

fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// The two 12-hour shifts of the line: day shift 07:00-19:00, night shift 19:00-07:00
pub fn default_shifts() -> Vec<ShiftDefinition> {
    vec![
        ShiftDefinition::new(1, time_of_day(7, 0), time_of_day(19, 0)),
        ShiftDefinition::new(2, time_of_day(19, 0), time_of_day(7, 0)),
    ]
}

/// Resolves shifts from wall-clock time.
///
/// The resolver holds no state beyond the static shift definitions, every
/// operation is a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct ShiftResolver {
    shifts: Vec<ShiftDefinition>,
}

impl ShiftResolver {
    pub fn new(shifts: Vec<ShiftDefinition>) -> Self {
        Self { shifts }
    }

    pub fn shifts(&self) -> &[ShiftDefinition] {
        &self.shifts
    }

    /// Shift definition with the given number
    pub fn shift(&self, number: u8) -> Option<&ShiftDefinition> {
        self.shifts.iter().find(|shift| shift.number == number)
    }

    /// First configured shift whose window contains `now`
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveTime;
    /// use line_oee_monitor::production::shift::{default_shifts, ShiftResolver};
    ///
    /// let resolver = ShiftResolver::new(default_shifts());
    /// let late = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
    /// assert_eq!(resolver.current_shift(late).map(|s| s.number), Some(2));
    /// ```
    pub fn current_shift(&self, now: NaiveTime) -> Option<&ShiftDefinition> {
        self.shifts.iter().find(|shift| shift.contains(now))
    }

    /// Calendar instant at which a shift starts.
    ///
    /// `for_date` is the calendar day the shift ends on. An overnight
    /// shift therefore starts on the previous day, e.g. the night shift
    /// ending on the morning of `for_date` began at 19:00 the day before.
    pub fn shift_start_time(&self, shift_number: u8, for_date: NaiveDate) -> Option<NaiveDateTime> {
        let shift = self.shift(shift_number)?;
        let start_date = if shift.is_overnight() {
            for_date.pred_opt()?
        } else {
            for_date
        };
        Some(start_date.and_time(shift.start))
    }

    /// Start instant of the shift running at `now`.
    ///
    /// Falls back to shift 1 when no configured shift covers `now`. An
    /// overnight shift seen before midnight started the same day, after
    /// midnight it started the day before.
    pub fn current_shift_start_time(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let shift = match self.current_shift(now.time()) {
            Some(shift) => shift,
            None => self.shift(1)?,
        };
        let start_date = if shift.is_overnight() && now.time() < shift.start {
            now.date().pred_opt()?
        } else {
            now.date()
        };
        Some(start_date.and_time(shift.start))
    }

    /// `[start, end)` window of a shift, anchored like [`Self::shift_start_time`]
    pub fn shift_window(
        &self,
        shift_number: u8,
        for_date: NaiveDate,
    ) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let shift = self.shift(shift_number)?;
        let start = self.shift_start_time(shift_number, for_date)?;
        Some((start, start + shift.duration()))
    }
}

impl Default for ShiftResolver {
    fn default() -> Self {
        Self::new(default_shifts())
    }
}
