// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Background services of the line monitor: the counter polling loop, the
//! snapshot it publishes and the heartbeat.
//!
//! ## Components
//!
//! * **Launch Daemon**: starting, monitoring, and gracefully shutting down
//!   background tasks
//! * **Polling Loop**: the per-tick read / derive / publish cycle
//! * **Shared State**: the published line snapshot
//!
//! ## Usage
//!
//! ```no_run
//! use line_oee_monitor::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Wait for shutdown signal (e.g., Ctrl+C)
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;
pub mod polling_loop;
pub mod shared_state;

pub use launch_daemon::Daemon;
pub use polling_loop::{DowntimeReasonHandle, PollingCommand, PollingLoop, TickOutcome};
pub use shared_state::{LineSnapshot, SnapshotPublisher};
