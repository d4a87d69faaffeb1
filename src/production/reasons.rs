// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Catalogue of known downtime reasons
//!
//! Operators may still submit free text; the catalogue only gives the
//! common causes a stable code and category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DowntimeReason {
    AutoDetected,
    Maintenance,
    MaterialWait,
    QualityIssue,
}

/// Broad family a downtime reason belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Undetermined,
    Planned,
    Logistics,
    Quality,
}

impl DowntimeReason {
    pub const ALL: [DowntimeReason; 4] = [
        DowntimeReason::AutoDetected,
        DowntimeReason::Maintenance,
        DowntimeReason::MaterialWait,
        DowntimeReason::QualityIssue,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DowntimeReason::AutoDetected => "AUTO_DETECTED",
            DowntimeReason::Maintenance => "MAINTENANCE",
            DowntimeReason::MaterialWait => "MATERIAL_WAIT",
            DowntimeReason::QualityIssue => "QUALITY_ISSUE",
        }
    }

    /// Text recorded on downtime events
    pub fn label(&self) -> &'static str {
        match self {
            DowntimeReason::AutoDetected => "auto-detected downtime",
            DowntimeReason::Maintenance => "maintenance",
            DowntimeReason::MaterialWait => "waiting for material",
            DowntimeReason::QualityIssue => "quality issue",
        }
    }

    pub fn category(&self) -> ReasonCategory {
        match self {
            DowntimeReason::AutoDetected => ReasonCategory::Undetermined,
            DowntimeReason::Maintenance => ReasonCategory::Planned,
            DowntimeReason::MaterialWait => ReasonCategory::Logistics,
            DowntimeReason::QualityIssue => ReasonCategory::Quality,
        }
    }

    /// Match a recorded reason text back to the catalogue
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for DowntimeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DowntimeReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown downtime reason code: {}", s))
    }
}
