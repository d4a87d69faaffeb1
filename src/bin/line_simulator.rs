// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::time::{self, Duration};

use line_oee_monitor::config::RegisterMap;
use line_oee_monitor::modbus::counter_simulator::{serve, CounterSimulator};

/// Modbus TCP server simulating the counters of a production line.
///
/// The line alternates between a producing phase and a stalled phase so
/// the monitor sees both running and downtime periods.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listening address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Listening port
    #[clap(long, default_value = "5020")]
    port: u16,

    /// Production rate while running, in units per hour
    #[clap(long, default_value = "1000")]
    rate_per_hour: f64,

    /// Length of each producing phase, in seconds
    #[clap(long, default_value = "600")]
    run_secs: u64,

    /// Length of each stalled phase, in seconds (0 never stalls)
    #[clap(long, default_value = "240")]
    stall_secs: u64,

    /// Starting value of the total counter
    #[clap(long, default_value = "0")]
    initial_total: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let simulator = CounterSimulator::new(RegisterMap::default());
    simulator.set_total(args.initial_total);

    let socket_addr = format!("{}:{}", args.address, args.port);
    let listener = TcpListener::bind(&socket_addr).await?;

    let server_simulator = simulator.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = serve(listener, server_simulator).await {
            error!("Modbus server error: {}", e);
        }
    });

    let cycle = args.run_secs + args.stall_secs;
    let units_per_second = args.rate_per_hour / 3600.0;
    let mut pending_units = 0.0;
    let mut elapsed = 0u64;
    let mut ticker = time::interval(Duration::from_secs(1));

    info!(
        "Simulating {} units/h, {} s running then {} s stalled",
        args.rate_per_hour, args.run_secs, args.stall_secs
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let phase = if cycle == 0 { 0 } else { elapsed % cycle };
                if phase < args.run_secs || args.stall_secs == 0 {
                    pending_units += units_per_second;
                    let whole = pending_units.floor();
                    if whole >= 1.0 {
                        simulator.advance(whole as u32);
                        pending_units -= whole;
                    }
                } else if phase == args.run_secs {
                    info!("Line stalled at total {}", simulator.total());
                }
                elapsed += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping simulator at total {}", simulator.total());
                break;
            }
        }
    }

    server.abort();
    Ok(())
}
