// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Counter register reader
//!
//! Every read opens a fresh session on the transport, issues exactly one
//! read request and closes the session again whatever the outcome.
//! Connecting and reading together are bounded by the configured timeout.
//!
//! ## Register Map
//!
//! | Register Address | Description | Width |
//! |-----------------|-------------|-------|
//! | 6000 (+6001) | Total production counter | 32 bits, high word first |
//! | 6001 | Hourly counter | 16 bits |
//! | 6011 | Auxiliary counter | 16 bits |
//!
//! The hourly counter address overlaps the low word of the total counter
//! on the line PLC. Both are read independently.

use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, warn};

use super::transport::ModbusTransport;
use crate::config::{ModbusConfig, RegisterMap};
use crate::error::TransportError;
use crate::production::reading::CounterReading;

/// Reads line counters through a [`ModbusTransport`]
pub struct RegisterReader<T: ModbusTransport> {
    transport: T,
    device_id: u8,
    timeout: Duration,
    registers: RegisterMap,
}

impl<T: ModbusTransport> RegisterReader<T> {
    pub fn new(transport: T, device_id: u8, timeout: Duration, registers: RegisterMap) -> Self {
        Self {
            transport,
            device_id,
            timeout,
            registers,
        }
    }

    pub fn from_config(transport: T, config: &ModbusConfig) -> Self {
        Self::new(transport, config.device_id, config.timeout(), config.registers)
    }

    pub fn registers(&self) -> RegisterMap {
        self.registers
    }

    /// Read a 32-bit counter stored in two consecutive registers, high word first
    pub async fn read_counter_32(&mut self, address: u16) -> Result<u32, TransportError> {
        let registers = self.read_registers(address, 2).await?;
        Ok(combine_words(registers[0], registers[1]))
    }

    pub async fn read_counter_16(&mut self, address: u16) -> Result<u16, TransportError> {
        let registers = self.read_registers(address, 1).await?;
        Ok(registers[0])
    }

    /// Read all line counters for one tick.
    ///
    /// The total counter is mandatory. A failed hourly or auxiliary
    /// counter read is logged and reported as 0.
    pub async fn read_counters(&mut self, now: DateTime<Local>) -> Result<CounterReading, TransportError> {
        let total = self.read_counter_32(self.registers.total_counter).await?;
        let hour_count = self
            .read_counter_16(self.registers.hour_counter)
            .await
            .unwrap_or_else(|e| {
                warn!("Hourly counter unavailable, using 0: {}", e);
                0
            });
        let aux_count = self
            .read_counter_16(self.registers.aux_counter)
            .await
            .unwrap_or_else(|e| {
                warn!("Auxiliary counter unavailable, using 0: {}", e);
                0
            });

        debug!(
            "Counters read: total={} hour={} aux={}",
            total, hour_count, aux_count
        );
        Ok(CounterReading::new(now, total, hour_count, aux_count))
    }

    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let result = self.read_once(address, count).await;
        self.transport.close().await;
        let registers = result?;

        if registers.len() < count as usize {
            return Err(TransportError::MalformedResponse {
                address,
                expected: count,
                actual: registers.len(),
            });
        }
        Ok(registers)
    }

    async fn read_once(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let device_id = self.device_id;
        let transport = &mut self.transport;
        let session = async move {
            transport.connect().await?;
            transport
                .read_input_registers(address, count, device_id)
                .await
        };
        match tokio::time::timeout(self.timeout, session).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}

/// Assemble a 32-bit value from its high and low 16-bit words
pub fn combine_words(high: u16, low: u16) -> u32 {
    ((high as u32) << 16) | low as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::transport::MockModbusTransport;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Device that accepts nothing and never refuses either
    struct BlackholeTransport {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ModbusTransport for BlackholeTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            tokio::time::sleep(Duration::from_secs(130)).await;
            Ok(())
        }

        async fn read_input_registers(
            &mut self,
            _address: u16,
            _count: u16,
            _device_id: u8,
        ) -> Result<Vec<u16>, TransportError> {
            Ok(vec![0, 0])
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn reader(transport: MockModbusTransport) -> RegisterReader<MockModbusTransport> {
        RegisterReader::new(transport, 175, Duration::from_secs(5), RegisterMap::default())
    }

    #[test]
    fn test_combine_words() {
        assert_eq!(combine_words(0x0001, 0x0002), 65538);
        assert_eq!(combine_words(0xFFFF, 0xFFFF), u32::MAX);
        assert_eq!(combine_words(0, 1000), 1000);
    }

    #[tokio::test]
    async fn test_read_counter_32_connects_reads_once_and_closes() {
        let mut transport = MockModbusTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        transport
            .expect_read_input_registers()
            .with(eq(6000), eq(2), eq(175))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(vec![0x0001, 0x0002]));
        transport
            .expect_close()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| ());

        let value = reader(transport).read_counter_32(6000).await.unwrap();
        assert_eq!(value, 65538);
    }

    #[tokio::test]
    async fn test_connect_failure_still_closes() {
        let mut transport = MockModbusTransport::new();
        transport.expect_connect().times(1).returning(|| {
            Err(TransportError::Connect {
                address: "10.0.0.175:502".to_string(),
                reason: "connection refused".to_string(),
            })
        });
        transport.expect_read_input_registers().never();
        transport.expect_close().times(1).returning(|| ());

        let err = reader(transport).read_counter_16(6011).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_connect_times_out() {
        let closed = Arc::new(AtomicBool::new(false));
        let transport = BlackholeTransport {
            closed: closed.clone(),
        };
        let mut reader =
            RegisterReader::new(transport, 175, Duration::from_secs(5), RegisterMap::default());

        let started = Instant::now();
        let err = reader.read_counter_32(6000).await.unwrap_err();

        assert_eq!(err, TransportError::Timeout(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_short_response_is_malformed() {
        let mut transport = MockModbusTransport::new();
        transport.expect_connect().returning(|| Ok(()));
        transport
            .expect_read_input_registers()
            .returning(|_, _, _| Ok(vec![7]));
        transport.expect_close().times(1).returning(|| ());

        let err = reader(transport).read_counter_32(6000).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::MalformedResponse {
                address: 6000,
                expected: 2,
                actual: 1
            }
        );
    }

    #[tokio::test]
    async fn test_read_counters_degrades_16_bit_failures() {
        let mut transport = MockModbusTransport::new();
        transport.expect_connect().times(3).returning(|| Ok(()));
        transport
            .expect_read_input_registers()
            .with(eq(6000), eq(2), eq(175))
            .returning(|_, _, _| Ok(vec![0, 1500]));
        transport
            .expect_read_input_registers()
            .with(eq(6001), eq(1), eq(175))
            .returning(|_, _, _| Err(TransportError::Exception("Illegal data address".to_string())));
        transport
            .expect_read_input_registers()
            .with(eq(6011), eq(1), eq(175))
            .returning(|_, _, _| Ok(vec![42]));
        transport.expect_close().times(3).returning(|| ());

        let now = Local::now();
        let reading = reader(transport).read_counters(now).await.unwrap();
        assert_eq!(reading, CounterReading::new(now, 1500, 0, 42));
    }

    #[tokio::test]
    async fn test_read_counters_fails_without_total() {
        let mut transport = MockModbusTransport::new();
        transport.expect_connect().times(1).returning(|| Ok(()));
        transport
            .expect_read_input_registers()
            .times(1)
            .returning(|_, _, _| Err(TransportError::Io("broken pipe".to_string())));
        transport.expect_close().times(1).returning(|| ());

        let result = reader(transport).read_counters(Local::now()).await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
