// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the Modbus TCP transport and register reader
//!
//! These tests start a simulated counter device on an ephemeral port and
//! read it through the real TCP transport.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use tokio::net::TcpListener;
use tokio::time;

use line_oee_monitor::config::RegisterMap;
use line_oee_monitor::error::TransportError;
use line_oee_monitor::modbus::counter_simulator::{serve, CounterSimulator};
use line_oee_monitor::modbus::{ModbusTransport, RegisterReader, TcpModbusTransport};

/// Start a simulated counter device in the background
async fn start_test_server(
) -> Result<(SocketAddr, CounterSimulator, tokio::task::JoinHandle<()>), Box<dyn std::error::Error>>
{
    // Use port 0 to let the OS assign an available port
    let socket_addr = SocketAddr::from_str("127.0.0.1:0")?;
    let listener = TcpListener::bind(socket_addr).await?;
    let socket_addr = listener.local_addr()?;

    let simulator = CounterSimulator::new(RegisterMap::default());
    let server_simulator = simulator.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, server_simulator).await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server a moment to start
    time::sleep(Duration::from_millis(100)).await;

    Ok((socket_addr, simulator, handle))
}

fn reader_for(socket_addr: SocketAddr) -> RegisterReader<TcpModbusTransport> {
    RegisterReader::new(
        TcpModbusTransport::new(socket_addr.to_string()),
        175,
        Duration::from_secs(2),
        RegisterMap::default(),
    )
}

#[tokio::test]
async fn test_read_counters_over_tcp() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, simulator, server) = start_test_server().await?;
    simulator.set_total(123_456);
    simulator.set_register(6011, 77);

    let mut reader = reader_for(socket_addr);
    let reading = reader.read_counters(Local::now()).await?;

    assert!(reading.success);
    assert_eq!(reading.ivams_total, 123_456);
    // The hourly counter register is the low word of the total
    assert_eq!(reading.hour_count, (123_456 & 0xFFFF) as u16);
    assert_eq!(reading.aux_count, 77);

    // Counters move between two reads, each read opens a new session
    simulator.advance(4);
    assert_eq!(reader.read_counter_32(6000).await?, 123_460);

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_missing_register_is_exception() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, simulator, server) = start_test_server().await?;
    simulator.set_total(1000);
    simulator.remove_register(6011);

    let mut reader = reader_for(socket_addr);
    let err = reader.read_counter_16(6011).await.unwrap_err();
    assert!(matches!(err, TransportError::Exception(_)), "{:?}", err);

    // The auxiliary counter degrades to 0, the reading still succeeds
    let reading = reader.read_counters(Local::now()).await?;
    assert_eq!(reading.ivams_total, 1000);
    assert_eq!(reading.aux_count, 0);

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_connection_refused() -> Result<(), Box<dyn std::error::Error>> {
    // Reserve a port, then free it so nothing listens there
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let socket_addr = listener.local_addr()?;
    drop(listener);

    let mut reader = reader_for(socket_addr);
    let err = reader.read_counters(Local::now()).await.unwrap_err();
    assert!(matches!(err, TransportError::Connect { .. }), "{:?}", err);

    Ok(())
}

#[tokio::test]
async fn test_silent_device_times_out() -> Result<(), Box<dyn std::error::Error>> {
    // Accept connections but never answer
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let socket_addr = listener.local_addr()?;
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let mut reader = RegisterReader::new(
        TcpModbusTransport::new(socket_addr.to_string()),
        175,
        Duration::from_millis(300),
        RegisterMap::default(),
    );
    let err = reader.read_counter_32(6000).await.unwrap_err();
    assert_eq!(err, TransportError::Timeout(Duration::from_millis(300)));

    silent.abort();
    Ok(())
}

#[tokio::test]
async fn test_close_without_connect_is_harmless() -> Result<(), Box<dyn std::error::Error>> {
    let mut transport = TcpModbusTransport::new("127.0.0.1:1");
    transport.close().await;
    assert!(!transport.is_connected());

    let err = transport.read_input_registers(6000, 2, 1).await.unwrap_err();
    assert_eq!(err, TransportError::NotConnected);
    Ok(())
}
