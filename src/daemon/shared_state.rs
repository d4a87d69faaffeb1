// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared line state
//!
//! The polling loop publishes one immutable [`LineSnapshot`] per tick.
//! Publishing swaps the whole `Arc` under the lock, readers clone the `Arc`
//! and never see a partially updated snapshot.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::production::{CounterReading, DowntimeStatus, OeeResult, PowerSummary};

/// Counters of the last tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionData {
    #[serde(flatten)]
    pub reading: CounterReading,
    pub production_delta: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShiftInfo {
    pub shift_number: Option<u8>,
    pub shift_start: Option<NaiveDateTime>,
}

/// Everything known about the line after the last tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub production_data: Option<ProductionData>,
    pub oee_data: Option<OeeResult>,
    pub downtime_status: DowntimeStatus,
    pub shift_info: ShiftInfo,
    pub power: PowerSummary,
    pub last_update: Option<DateTime<Local>>,
    /// Time of the last tick where the device answered
    pub last_successful_read: Option<DateTime<Local>>,
}

impl LineSnapshot {
    /// Copy of this snapshot for a tick where the device gave no data.
    ///
    /// Downtime, OEE and shift figures are kept as they were.
    pub fn without_data(&self, now: DateTime<Local>) -> Self {
        Self {
            production_data: Some(ProductionData {
                reading: CounterReading::no_data(now),
                production_delta: 0,
            }),
            last_update: Some(now),
            ..self.clone()
        }
    }

    /// Whether the last tick brought fresh counters
    pub fn has_data(&self) -> bool {
        self.production_data
            .map(|data| data.reading.success)
            .unwrap_or(false)
    }
}

/// Publication point of the latest [`LineSnapshot`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotPublisher {
    latest: Arc<RwLock<Arc<LineSnapshot>>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, snapshot: LineSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.latest.write().await = snapshot;
    }

    pub async fn latest(&self) -> Arc<LineSnapshot> {
        self.latest.read().await.clone()
    }
}
