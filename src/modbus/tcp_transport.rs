// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP client transport
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The counter device is the server, the
//! monitor is the client reading from it.

use async_trait::async_trait;
use log::{debug, warn};
use tokio::net::lookup_host;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

use super::transport::ModbusTransport;
use crate::config::ModbusConfig;
use crate::error::TransportError;

/// [`ModbusTransport`] over a TCP connection built with `tokio-modbus`
pub struct TcpModbusTransport {
    address: String,
    ctx: Option<Context>,
}

impl TcpModbusTransport {
    /// `address` is a `host:port` pair, the host may be a name
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ctx: None,
        }
    }

    pub fn from_config(config: &ModbusConfig) -> Self {
        Self::new(config.socket_address())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    fn connect_error(&self, reason: impl ToString) -> TransportError {
        TransportError::Connect {
            address: self.address.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ModbusTransport for TcpModbusTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.ctx.is_some() {
            return Ok(());
        }

        let socket_addr = lookup_host(self.address.as_str())
            .await
            .map_err(|e| self.connect_error(e))?
            .next()
            .ok_or_else(|| self.connect_error("address did not resolve"))?;

        debug!("Connecting to Modbus server at {}", socket_addr);
        let ctx = tcp::connect(socket_addr)
            .await
            .map_err(|e| self.connect_error(e))?;
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        device_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        ctx.set_slave(Slave(device_id));

        debug!(
            "Reading {} input registers starting from address {} on unit {}",
            count, address, device_id
        );
        match ctx.read_input_registers(address, count).await {
            Ok(Ok(registers)) => Ok(registers),
            Ok(Err(exception)) => Err(TransportError::Exception(exception.to_string())),
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }

    async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(e) = ctx.disconnect().await {
                warn!("Error while closing Modbus connection to {}: {}", self.address, e);
            }
        }
    }
}
