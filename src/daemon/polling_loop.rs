// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Counter polling loop
//!
//! One task polls the counter device at a fixed interval. Each tick reads
//! the counters, derives delta, downtime, shift, OEE and power, hands the
//! records to the storage sink and publishes a new [`LineSnapshot`].
//!
//! Ticks run strictly one after another. The downtime detector is owned by
//! the loop, other tasks change the downtime reason through a
//! [`DowntimeReasonHandle`].

use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, Timelike};
use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use super::shared_state::{LineSnapshot, ProductionData, ShiftInfo, SnapshotPublisher};
use crate::config::Config;
use crate::error::{MonitorError, StorageError};
use crate::modbus::{ModbusTransport, RegisterReader};
use crate::production::{
    instantaneous_power, CounterReading, DowntimeDetector, DowntimeReason, DowntimeStatus,
    OeeCalculator, OeeResult, PowerSummary, PowerTracker, ShiftResolver,
};
use crate::storage::StorageSink;

/// Commands accepted by the polling loop
#[derive(Debug, Clone, PartialEq)]
pub enum PollingCommand {
    /// Set the reason of the current or next downtime
    SetDowntimeReason(String),
}

/// Cloneable handle to submit downtime reasons to a running loop
#[derive(Debug, Clone)]
pub struct DowntimeReasonHandle {
    sender: mpsc::UnboundedSender<PollingCommand>,
}

impl DowntimeReasonHandle {
    pub fn set_downtime_reason(&self, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        let reason = reason.trim();
        if reason.is_empty() {
            anyhow::bail!("Downtime reason must not be empty");
        }
        self.sender
            .send(PollingCommand::SetDowntimeReason(reason.to_string()))
            .map_err(|_| anyhow::anyhow!("Polling loop is not running"))
    }

    pub fn set_known_reason(&self, reason: DowntimeReason) -> Result<()> {
        self.set_downtime_reason(reason.label())
    }
}

/// What a successful tick derived
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub reading: CounterReading,
    pub production_delta: u32,
    pub downtime: DowntimeStatus,
    pub shift_number: u8,
    pub oee: OeeResult,
    pub power: PowerSummary,
    /// Records the storage sink refused this tick
    pub storage_errors: Vec<StorageError>,
}

pub struct PollingLoop<T: ModbusTransport> {
    reader: RegisterReader<T>,
    detector: DowntimeDetector,
    resolver: ShiftResolver,
    calculator: OeeCalculator,
    power: PowerTracker,
    sink: Arc<dyn StorageSink>,
    publisher: SnapshotPublisher,
    commands: mpsc::UnboundedReceiver<PollingCommand>,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl<T: ModbusTransport> PollingLoop<T> {
    /// Build a loop from the configuration. The returned handle feeds
    /// downtime reasons to this loop.
    pub fn new(
        reader: RegisterReader<T>,
        config: &Config,
        sink: Arc<dyn StorageSink>,
        publisher: SnapshotPublisher,
    ) -> (Self, DowntimeReasonHandle) {
        let (sender, commands) = mpsc::unbounded_channel();
        let polling_loop = Self {
            reader,
            detector: DowntimeDetector::new(config.monitoring.downtime_threshold()),
            resolver: ShiftResolver::new(config.shifts.clone()),
            calculator: OeeCalculator::from_config(&config.production),
            power: PowerTracker::new(),
            sink,
            publisher,
            commands,
            poll_interval: config.monitoring.poll_interval(),
            error_backoff: config.monitoring.error_backoff(),
        };
        (polling_loop, DowntimeReasonHandle { sender })
    }

    pub fn detector(&self) -> &DowntimeDetector {
        &self.detector
    }

    pub fn handle_command(&mut self, command: PollingCommand) {
        match command {
            PollingCommand::SetDowntimeReason(reason) => {
                info!("Downtime reason set by operator: {}", reason);
                self.detector.add_downtime_reason(reason);
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    /// Run one polling tick at `now`.
    ///
    /// A failed total counter read publishes a "no data" snapshot and
    /// returns the transport error, leaving downtime and OEE state
    /// untouched. Storage failures do not fail the tick, they are reported
    /// in the outcome.
    pub async fn tick(&mut self, now: DateTime<Local>) -> Result<TickOutcome, MonitorError> {
        self.drain_commands();

        let reading = match self.reader.read_counters(now).await {
            Ok(reading) => reading,
            Err(e) => {
                let previous = self.publisher.latest().await;
                self.publisher.publish(previous.without_data(now)).await;
                return Err(e.into());
            }
        };

        let mut storage_errors = Vec::new();
        let production_delta = match self.sink.save_production_reading(&reading).await {
            Ok(delta) => delta,
            Err(e) => {
                warn!("Failed to store production reading: {}", e);
                storage_errors.push(e);
                0
            }
        };

        let downtime = self.detector.check_downtime(reading.ivams_total, now);

        let local_now = now.naive_local();
        let shift_number = self
            .resolver
            .current_shift(local_now.time())
            .map(|shift| shift.number)
            .unwrap_or(1);
        let shift_start = self.resolver.current_shift_start_time(local_now);

        let oee = self.calculator.calculate_tick_oee(production_delta);
        if let Err(e) = self.sink.save_oee_sample(now, &oee).await {
            warn!("Failed to store OEE sample: {}", e);
            storage_errors.push(e);
        }

        let power_value = instantaneous_power(production_delta, self.poll_interval)?;
        let power = self.power.record(local_now, power_value);
        if power_value > 0.0 {
            if let Err(e) = self
                .sink
                .save_power_sample(
                    local_now.date(),
                    local_now.hour(),
                    local_now.minute(),
                    power_value,
                )
                .await
            {
                warn!("Failed to store power sample: {}", e);
                storage_errors.push(e);
            }
        }

        if let Some(event) = &downtime.info {
            if let Err(e) = self.sink.save_downtime_event(event, shift_number).await {
                warn!("Failed to store downtime event: {}", e);
                storage_errors.push(e);
            }
        }

        self.publisher
            .publish(LineSnapshot {
                production_data: Some(ProductionData {
                    reading,
                    production_delta,
                }),
                oee_data: Some(oee),
                downtime_status: downtime.clone(),
                shift_info: ShiftInfo {
                    shift_number: Some(shift_number),
                    shift_start,
                },
                power,
                last_update: Some(now),
                last_successful_read: Some(now),
            })
            .await;

        debug!(
            "Tick: total={} delta={} downtime={} shift={} oee={:.2}% power={:.0}/h",
            reading.ivams_total,
            production_delta,
            downtime.is_downtime,
            shift_number,
            oee.oee_percentage,
            power.current
        );

        Ok(TickOutcome {
            reading,
            production_delta,
            downtime,
            shift_number,
            oee,
            power,
            storage_errors,
        })
    }

    /// Poll until `running` is cleared.
    ///
    /// A tick without data keeps the regular cadence. Any other fault,
    /// a panic included, is logged and followed by the error backoff.
    pub async fn run(mut self, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Starting polling loop (interval: {:?}, downtime threshold: {:?})",
            self.poll_interval,
            self.detector.threshold()
        );

        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                command = self.commands.recv(), if commands_open => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            debug!("All downtime reason handles dropped");
                            commands_open = false;
                        }
                    }
                }

                _ = interval.tick() => {
                    let now = Local::now();
                    match AssertUnwindSafe(self.tick(now)).catch_unwind().await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) if e.is_no_data() => {
                            warn!("{}", e);
                        }
                        Ok(Err(e)) => {
                            error!("Error in polling tick: {}", e);
                            time::sleep(self.error_backoff).await;
                        }
                        Err(_) => {
                            error!("Polling tick panicked, resuming after backoff");
                            time::sleep(self.error_backoff).await;
                        }
                    }
                }
            }
        }

        info!("Polling loop stopping");
        Ok(())
    }
}
