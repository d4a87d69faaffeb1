// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy of the monitoring core
//!
//! Every fault raised while polling the line is local and non-fatal:
//!
//! - [`TransportError`]: the counter device could not be read. The tick
//!   degrades to "no data" and the next tick retries.
//! - [`ComputationFault`]: a numeric derivation produced no usable value.
//!   Callers substitute a zeroed result instead of propagating it.
//! - [`StorageError`]: the storage sink refused a record. It is logged and
//!   never blocks the in-memory derivation.
//!
//! [`MonitorError`] is what a polling tick hands to the loop's top-level
//! handler.

use std::time::Duration;

use thiserror::Error;

/// Failure while talking to the Modbus counter device
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Failed to connect to Modbus device at {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Modbus device answered with exception: {0}")]
    Exception(String),

    #[error("Modbus I/O error: {0}")]
    Io(String),

    #[error("Modbus read timed out after {0:?}")]
    Timeout(Duration),

    #[error("Expected {expected} registers from address {address}, got {actual}")]
    MalformedResponse {
        address: u16,
        expected: u16,
        actual: usize,
    },
}

/// A numeric derivation that could not produce a finite value
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Computation fault in {operation}: {reason}")]
pub struct ComputationFault {
    pub operation: &'static str,
    pub reason: String,
}

/// Failure reported by a storage sink
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to persist {record}: {reason}")]
    Rejected { record: &'static str, reason: String },
}

/// Fault surfaced by a polling tick to the loop handler
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("No data this tick: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Computation(#[from] ComputationFault),
}

impl MonitorError {
    /// Whether the fault only means the device had nothing for us this tick.
    ///
    /// Such ticks keep the regular cadence, every other fault triggers the
    /// extended backoff.
    pub fn is_no_data(&self) -> bool {
        matches!(self, MonitorError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_classification() {
        let err = MonitorError::from(TransportError::Timeout(Duration::from_secs(5)));
        assert!(err.is_no_data());

        let err = MonitorError::from(ComputationFault {
            operation: "power",
            reason: "poll interval is zero".to_string(),
        });
        assert!(!err.is_no_data());
    }

    #[test]
    fn test_error_messages() {
        let err = TransportError::MalformedResponse {
            address: 6000,
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Expected 2 registers from address 6000, got 1"
        );

        let err = StorageError::Rejected {
            record: "oee sample",
            reason: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to persist oee sample: disk full");
    }
}
