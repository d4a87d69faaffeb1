// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated line counter device
//!
//! A Modbus TCP server exposing the counter input registers of a production
//! line. It backs the `line_simulator` binary and the transport integration
//! tests.
//!
//! ### Input Registers (Read Only)
//!
//! | Register Address | Description |
//! |-----------------|-------------|
//! | 6000 | Total counter, high word |
//! | 6001 | Total counter, low word (also read as the hourly counter) |
//! | 6011 | Auxiliary counter |
//!
//! Addresses follow the configured [`RegisterMap`].

use std::{
    collections::HashMap,
    future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::config::RegisterMap;

/// Modbus service simulating the line counter device.
///
/// Clones share the same registers, so one instance can serve every
/// client connection while the simulation advances the counters.
#[derive(Clone)]
pub struct CounterSimulator {
    input_registers: Arc<Mutex<HashMap<u16, u16>>>,
    registers: RegisterMap,
}

impl tokio_modbus::server::Service for CounterSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadInputRegisters(addr, cnt) => {
                register_read(&self.lock_registers(), addr, cnt).map(Response::ReadInputRegisters)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        future::ready(res)
    }
}

impl CounterSimulator {
    /// Create a simulator with every counter at zero
    pub fn new(registers: RegisterMap) -> Self {
        let simulator = Self {
            input_registers: Arc::new(Mutex::new(HashMap::new())),
            registers,
        };
        simulator.set_register(registers.hour_counter, 0);
        simulator.set_register(registers.aux_counter, 0);
        simulator.set_total(0);
        simulator
    }

    fn lock_registers(&self) -> MutexGuard<'_, HashMap<u16, u16>> {
        self.input_registers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_register(&self, address: u16, value: u16) {
        self.lock_registers().insert(address, value);
    }

    /// Remove a register so reads covering it fail with an illegal address
    pub fn remove_register(&self, address: u16) {
        self.lock_registers().remove(&address);
    }

    pub fn register(&self, address: u16) -> Option<u16> {
        self.lock_registers().get(&address).copied()
    }

    /// Store the 32-bit total counter, high word first
    pub fn set_total(&self, value: u32) {
        let mut registers = self.lock_registers();
        let address = self.registers.total_counter;
        registers.insert(address, (value >> 16) as u16);
        registers.insert(address.wrapping_add(1), (value & 0xFFFF) as u16);
    }

    pub fn total(&self) -> u32 {
        let registers = self.lock_registers();
        let address = self.registers.total_counter;
        let high = registers.get(&address).copied().unwrap_or(0) as u32;
        let low = registers.get(&address.wrapping_add(1)).copied().unwrap_or(0) as u32;
        (high << 16) | low
    }

    /// Count `units` more produced parts on every counter
    pub fn advance(&self, units: u32) {
        let total = self.total().wrapping_add(units);
        self.set_total(total);

        let total_words = [
            self.registers.total_counter,
            self.registers.total_counter.wrapping_add(1),
        ];
        for address in [self.registers.hour_counter, self.registers.aux_counter] {
            // A counter sharing a register with the total already moved with it
            if total_words.contains(&address) {
                continue;
            }
            let current = self.register(address).unwrap_or(0);
            self.set_register(address, current.wrapping_add(units as u16));
        }
    }
}

/// Helper function implementing reading registers from a HashMap.
fn register_read(
    registers: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut response_values = vec![0; cnt.into()];
    for i in 0..cnt {
        let reg_addr = addr.wrapping_add(i);
        if let Some(r) = registers.get(&reg_addr) {
            response_values[i as usize] = *r;
        } else {
            error!("Exception::IllegalDataAddress at register {}", reg_addr);
            return Err(ExceptionCode::IllegalDataAddress);
        }
    }

    Ok(response_values)
}

/// Serve `simulator` on `listener` until the task is aborted
pub async fn serve(listener: TcpListener, simulator: CounterSimulator) -> anyhow::Result<()> {
    info!("Counter simulator listening on {}", listener.local_addr()?);
    let server = Server::new(listener);

    let on_connected = move |stream, socket_addr| {
        let simulator = simulator.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                Ok(Some(simulator.clone()))
            })
        }
    };

    let on_process_error = |err| {
        error!("Modbus server error: {err}");
    };

    server.serve(&on_connected, on_process_error).await?;
    Ok(())
}
