// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the production line OEE monitor

use anyhow::Result;
use clap::Parser;
use log::info;

use std::path::PathBuf;
use tokio::signal;

use line_oee_monitor::config::{self, Config};
use line_oee_monitor::daemon::Daemon;
use line_oee_monitor::SystemInfo;

/// Production line monitor: Modbus counter polling, downtime detection and OEE
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Counter device address
    #[arg(long)]
    modbus_host: Option<String>,

    /// Counter device port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Modbus unit identifier of the counter device
    #[arg(long)]
    device_id: Option<u8>,

    /// Interval between two counter reads, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Stall duration classified as downtime, in seconds
    #[arg(long)]
    downtime_threshold_secs: Option<u64>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.modbus_host.clone(),
        args.modbus_port,
        args.device_id,
        args.poll_interval_ms,
        args.downtime_threshold_secs,
    );

    let system_info = SystemInfo::from_config(&config);
    info!(
        "Starting monitor for {} (target {} units/h, downtime after {} s)",
        system_info.line_name, system_info.target_rate_per_hour, system_info.downtime_threshold_secs
    );

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}
