// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::Parser;

use line_oee_monitor::config::Config;
use line_oee_monitor::modbus::{RegisterReader, TcpModbusTransport};

/// Read the line counters once and print them
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Configuration file providing the device and register map
    #[clap(long)]
    config: Option<PathBuf>,

    /// Counter device address, overrides the configuration
    #[clap(long)]
    host: Option<String>,

    /// Counter device port, overrides the configuration
    #[clap(long)]
    port: Option<u16>,

    /// Modbus unit identifier, overrides the configuration
    #[clap(long)]
    device_id: Option<u8>,

    /// Print the reading as JSON
    #[clap(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_args(args.host.clone(), args.port, args.device_id, None, None);

    let registers = config.modbus.registers;
    println!(
        "Reading counters from {} (unit {})",
        config.modbus.socket_address(),
        config.modbus.device_id
    );

    let transport = TcpModbusTransport::from_config(&config.modbus);
    let mut reader = RegisterReader::from_config(transport, &config.modbus);
    let reading = reader.read_counters(Local::now()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
        return Ok(());
    }

    println!(
        "Register {}: Total counter = {}",
        registers.total_counter, reading.ivams_total
    );
    println!(
        "Register {}: Hourly counter = {}",
        registers.hour_counter, reading.hour_count
    );
    println!(
        "Register {}: Auxiliary counter = {}",
        registers.aux_counter, reading.aux_count
    );
    println!("Read at {}", reading.timestamp);

    Ok(())
}
