// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Production domain: counter readings, downtime, OEE, shifts and power

pub mod downtime;
pub mod oee;
pub mod power;
pub mod reading;
pub mod reasons;
pub mod shift;

pub use downtime::{DowntimeDetector, DowntimeEvent, DowntimeStatus};
pub use oee::{OeeCalculator, OeeResult, ShiftData};
pub use power::{instantaneous_power, PowerBuckets, PowerSummary, PowerTracker};
pub use reading::{production_delta, CounterReading};
pub use reasons::DowntimeReason;
pub use shift::{ShiftDefinition, ShiftResolver};
