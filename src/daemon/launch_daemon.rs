// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module runs and manages the background tasks of the line monitor:
//!
//! - Counter polling loop (Modbus reads, downtime, OEE, power)
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these services,
//! with proper error handling and task coordination.
//!
//! ## Usage
//!
//! ```no_run
//! use line_oee_monitor::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!
//!     // Wait for all tasks to complete
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time;

use super::polling_loop::{DowntimeReasonHandle, PollingLoop};
use super::shared_state::SnapshotPublisher;
use crate::config::Config;
use crate::modbus::{ModbusTransport, RegisterReader, TcpModbusTransport};
use crate::storage::MemoryStorage;

/// Coordinates the background tasks of the line monitor
///
/// # Fields
///
/// * `tasks` - Handles to running tasks for management and cleanup
/// * `running` - Flag shared between tasks to coordinate shutdown
/// * `publisher` - Latest line snapshot, readable by any task
/// * `storage` - In-memory record of everything the polling loop derived
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    publisher: SnapshotPublisher,
    storage: Arc<MemoryStorage>,
    reason_handle: Option<DowntimeReasonHandle>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            publisher: SnapshotPublisher::new(),
            storage: Arc::new(MemoryStorage::new()),
            reason_handle: None,
        }
    }

    /// Launch the polling loop against the configured Modbus TCP device,
    /// and the heartbeat.
    ///
    /// # Errors
    ///
    /// Fails when the configuration breaks the validation rules.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let transport = TcpModbusTransport::from_config(&config.modbus);
        self.launch_with_transport(config, transport).await
    }

    /// Same as [`Self::launch`] with a caller-provided transport
    pub async fn launch_with_transport<T>(&mut self, config: &Config, transport: T) -> Result<()>
    where
        T: ModbusTransport + 'static,
    {
        config.validate()?;
        info!(
            "Monitoring {} ({}) through Modbus device {} unit {}",
            config.line.name,
            config.line.code,
            config.modbus.socket_address(),
            config.modbus.device_id
        );

        self.start_polling_loop(config, transport)?;
        self.start_heartbeat(config)?;
        Ok(())
    }

    fn start_polling_loop<T>(&mut self, config: &Config, transport: T) -> Result<()>
    where
        T: ModbusTransport + 'static,
    {
        let reader = RegisterReader::from_config(transport, &config.modbus);
        let (polling_loop, handle) = PollingLoop::new(
            reader,
            config,
            self.storage.clone(),
            self.publisher.clone(),
        );
        self.reason_handle = Some(handle);

        let running = self.running.clone();
        let task = tokio::spawn(async move { polling_loop.run(running).await });

        self.tasks.push(task);
        Ok(())
    }

    /// Periodically log the line state
    fn start_heartbeat(&mut self, config: &Config) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let publisher = self.publisher.clone();
        let period = Duration::from_secs(config.monitoring.heartbeat_secs.max(1));
        let task = tokio::spawn(async move {
            let mut since_last_beat = period;
            while running.load(Ordering::SeqCst) {
                // Wake up every second to notice shutdown quickly
                if since_last_beat < period {
                    time::sleep(Duration::from_secs(1)).await;
                    since_last_beat += Duration::from_secs(1);
                    continue;
                }
                since_last_beat = Duration::ZERO;

                let snapshot = publisher.latest().await;
                match snapshot.last_successful_read {
                    Some(last_read) => debug!(
                        "Daemon heartbeat: last read {}, downtime={}, OEE={:.2}%",
                        last_read,
                        snapshot.downtime_status.is_downtime,
                        snapshot.oee_data.map(|oee| oee.oee_percentage).unwrap_or(0.0)
                    ),
                    None => debug!("Daemon heartbeat: no counter read yet"),
                }
                if snapshot.last_update.is_some() && !snapshot.has_data() {
                    warn!("Counter device gave no data on the last tick");
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    pub fn snapshot_publisher(&self) -> SnapshotPublisher {
        self.publisher.clone()
    }

    pub fn storage(&self) -> Arc<MemoryStorage> {
        self.storage.clone()
    }

    /// Handle to submit downtime reasons, once launched
    pub fn downtime_reason_handle(&self) -> Option<DowntimeReasonHandle> {
        self.reason_handle.clone()
    }

    /// Signal all tasks to stop
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Call after [`Self::shutdown`]. A task that panicked or did not stop
    /// within 5 seconds is logged, never turned into an error.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    log::error!("Task failed: {}", e);
                }
                Ok(Err(e)) => {
                    log::error!("Task panicked: {}", e);
                }
                Err(_) => {
                    log::warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}
