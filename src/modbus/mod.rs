// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module reads the production counters of the line from its Modbus TCP
//! counter device, and provides a simulated device for development and tests.
//!
//! ## Key Components
//!
//! - `ModbusTransport`: the connect / read / close capability the reader relies on.
//! - `TcpModbusTransport`: `tokio-modbus` TCP implementation of the transport.
//! - `RegisterReader`: decodes 16 and 32-bit counters into a `CounterReading`.
//! - `CounterSimulator`: Modbus TCP server exposing simulated counters.
//!
//! ## Usage
//!
//! ```no_run
//! use chrono::Local;
//! use line_oee_monitor::config::Config;
//! use line_oee_monitor::modbus::{RegisterReader, TcpModbusTransport};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let transport = TcpModbusTransport::from_config(&config.modbus);
//! let mut reader = RegisterReader::from_config(transport, &config.modbus);
//! let reading = reader.read_counters(Local::now()).await?;
//! println!("Total production: {}", reading.ivams_total);
//! # Ok(())
//! # }
//! ```

pub mod counter_simulator;
pub mod register_reader;
pub mod tcp_transport;
pub mod transport;

pub use counter_simulator::CounterSimulator;
pub use register_reader::RegisterReader;
pub use tcp_transport::TcpModbusTransport;
pub use transport::ModbusTransport;
