// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Transport capability used to read counter registers

use async_trait::async_trait;

use crate::error::TransportError;

/// Minimal Modbus client capability: open a session, read input
/// registers, close the session.
///
/// Implementations must turn every fault into a [`TransportError`] and
/// make `close` safe to call on a transport that never connected.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModbusTransport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Read `count` input registers starting at `address` from unit `device_id`
    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        device_id: u8,
    ) -> Result<Vec<u16>, TransportError>;

    async fn close(&mut self);
}
