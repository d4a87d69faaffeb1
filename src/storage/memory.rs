// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory storage sink with the reporting queries

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

use super::StorageSink;
use crate::error::StorageError;
use crate::production::{
    production_delta, CounterReading, DowntimeEvent, OeeCalculator, OeeResult, PowerBuckets,
    ShiftData, ShiftResolver,
};

/// Readings kept by default, a bit more than three days at a 3 s cadence
pub const DEFAULT_HISTORY_CAPACITY: usize = 100_000;

/// Days of power maxima kept by default
pub const DEFAULT_POWER_DAYS: usize = 31;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    #[serde(flatten)]
    pub reading: CounterReading,
    pub production_delta: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OeeSample {
    pub timestamp: DateTime<Local>,
    #[serde(flatten)]
    pub result: OeeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeRecord {
    #[serde(flatten)]
    pub event: DowntimeEvent,
    pub shift_number: u8,
}

/// Production and OEE summary of one shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftReport {
    pub date: NaiveDate,
    pub shift_number: u8,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub data: ShiftData,
    pub oee: OeeResult,
}

#[derive(Debug, Default)]
struct StorageState {
    last_total: Option<u32>,
    readings: VecDeque<StoredReading>,
    oee_samples: VecDeque<OeeSample>,
    downtime: Vec<DowntimeRecord>,
    power: BTreeMap<NaiveDate, PowerBuckets>,
}

/// Bounded in-memory [`StorageSink`]
///
/// Readings, OEE samples and downtime records beyond the capacity are
/// dropped oldest first. Power maxima are kept for the most recent
/// `power_days` dates.
#[derive(Debug)]
pub struct MemoryStorage {
    state: Mutex<StorageState>,
    capacity: usize,
    power_days: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(StorageState::default()),
            capacity: capacity.max(1),
            power_days: DEFAULT_POWER_DAYS,
        }
    }

    /// Keep power maxima for the `days` most recent dates
    pub fn with_power_days(mut self, days: usize) -> Self {
        self.power_days = days.max(1);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, StorageState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))
    }

    /// Most recent readings, newest first
    pub fn latest_readings(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        let state = self.lock()?;
        Ok(state.readings.iter().rev().take(limit).cloned().collect())
    }

    /// Most recent OEE samples, newest first
    pub fn oee_history(&self, limit: usize) -> Result<Vec<OeeSample>, StorageError> {
        let state = self.lock()?;
        Ok(state.oee_samples.iter().rev().take(limit).cloned().collect())
    }

    pub fn downtime_events(&self) -> Result<Vec<DowntimeRecord>, StorageError> {
        Ok(self.lock()?.downtime.clone())
    }

    /// Aggregate readings and downtime inside the window of `shift_number`
    /// ending on `date`. `None` for an unknown shift.
    pub fn shift_data(
        &self,
        resolver: &ShiftResolver,
        date: NaiveDate,
        shift_number: u8,
    ) -> Result<Option<ShiftData>, StorageError> {
        let (start, end) = match resolver.shift_window(shift_number, date) {
            Some(window) => window,
            None => return Ok(None),
        };
        let in_window = |timestamp: &DateTime<Local>| {
            let t = timestamp.naive_local();
            start <= t && t < end
        };

        let state = self.lock()?;
        let mut data = ShiftData::default();
        for stored in state.readings.iter().filter(|r| in_window(&r.reading.timestamp)) {
            data.total_production += stored.production_delta as u64;
            data.data_points += 1;
        }
        data.downtime_minutes = state
            .downtime
            .iter()
            .filter(|record| in_window(&record.event.start_time))
            .map(|record| record.event.duration_seconds / 60.0)
            .sum();

        Ok(Some(data))
    }

    pub fn shift_report(
        &self,
        resolver: &ShiftResolver,
        calculator: &OeeCalculator,
        date: NaiveDate,
        shift_number: u8,
    ) -> Result<Option<ShiftReport>, StorageError> {
        let (start, end) = match resolver.shift_window(shift_number, date) {
            Some(window) => window,
            None => return Ok(None),
        };
        Ok(self
            .shift_data(resolver, date, shift_number)?
            .map(|data| ShiftReport {
                date,
                shift_number,
                start,
                end,
                oee: calculator.calculate_shift_oee(&data),
                data,
            }))
    }

    /// 24 hourly power maxima of `date`, zeros when nothing was recorded
    pub fn hourly_power(&self, date: NaiveDate) -> Result<Vec<f64>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .power
            .get(&date)
            .map(|buckets| buckets.hourly.clone())
            .unwrap_or_else(|| PowerBuckets::new().hourly))
    }

    /// 24 x 60 minute power maxima of `date`
    pub fn minute_power(&self, date: NaiveDate) -> Result<Vec<Vec<f64>>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .power
            .get(&date)
            .map(|buckets| buckets.minutes.clone())
            .unwrap_or_else(|| PowerBuckets::new().minutes))
    }

    /// Dates with at least one reading, newest first
    pub fn available_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let state = self.lock()?;
        let dates: BTreeSet<NaiveDate> = state
            .readings
            .iter()
            .map(|stored| stored.reading.timestamp.date_naive())
            .collect();
        Ok(dates.into_iter().rev().collect())
    }

    fn trim<T>(queue: &mut VecDeque<T>, capacity: usize) {
        while queue.len() > capacity {
            queue.pop_front();
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageSink for MemoryStorage {
    async fn save_production_reading(&self, reading: &CounterReading) -> Result<u32, StorageError> {
        if !reading.success {
            return Err(StorageError::Rejected {
                record: "production reading",
                reason: "reading carries no data".to_string(),
            });
        }

        let mut state = self.lock()?;
        let delta = production_delta(state.last_total, reading.ivams_total);
        state.last_total = Some(reading.ivams_total);
        state.readings.push_back(StoredReading {
            reading: *reading,
            production_delta: delta,
        });
        Self::trim(&mut state.readings, self.capacity);
        Ok(delta)
    }

    async fn save_oee_sample(
        &self,
        timestamp: DateTime<Local>,
        oee: &OeeResult,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.oee_samples.push_back(OeeSample {
            timestamp,
            result: *oee,
        });
        Self::trim(&mut state.oee_samples, self.capacity);
        Ok(())
    }

    async fn save_downtime_event(
        &self,
        event: &DowntimeEvent,
        shift_number: u8,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let record = DowntimeRecord {
            event: event.clone(),
            shift_number,
        };
        match state
            .downtime
            .iter_mut()
            .find(|existing| existing.event.start_time == event.start_time)
        {
            Some(existing) => *existing = record,
            None => {
                debug!("New downtime record starting at {}", event.start_time);
                state.downtime.push(record);
                if state.downtime.len() > self.capacity {
                    state.downtime.remove(0);
                }
            }
        }
        Ok(())
    }

    async fn save_power_sample(
        &self,
        date: NaiveDate,
        hour: u32,
        minute: u32,
        value: f64,
    ) -> Result<(), StorageError> {
        if !value.is_finite() {
            return Err(StorageError::Rejected {
                record: "power sample",
                reason: format!("non-finite value {}", value),
            });
        }
        let mut state = self.lock()?;
        state
            .power
            .entry(date)
            .or_default()
            .record(hour, minute, value);
        while state.power.len() > self.power_days {
            state.power.pop_first();
        }
        Ok(())
    }
}
