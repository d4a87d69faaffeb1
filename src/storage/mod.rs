// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Storage sink
//!
//! The polling loop hands every derived record to a [`StorageSink`]. A sink
//! failure is logged by the loop and never blocks the in-memory derivation.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};

use crate::error::StorageError;
use crate::production::{CounterReading, DowntimeEvent, OeeResult};

pub use memory::{MemoryStorage, ShiftReport};

#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Persist a successful reading and return the production delta since
    /// the previous one
    async fn save_production_reading(&self, reading: &CounterReading) -> Result<u32, StorageError>;

    async fn save_oee_sample(
        &self,
        timestamp: DateTime<Local>,
        oee: &OeeResult,
    ) -> Result<(), StorageError>;

    /// Record an ongoing downtime. Called every tick while the line is
    /// stalled, with a growing duration for the same start time.
    async fn save_downtime_event(
        &self,
        event: &DowntimeEvent,
        shift_number: u8,
    ) -> Result<(), StorageError>;

    async fn save_power_sample(
        &self,
        date: NaiveDate,
        hour: u32,
        minute: u32,
        value: f64,
    ) -> Result<(), StorageError>;
}
