// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the line-oee-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP device configuration
//!
//! This module defines the structures describing how to reach the counter
//! device of the production line and which input registers hold its counters.

use std::net::Ipv6Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration of the Modbus TCP counter device.
///
/// # Fields
///
/// * `host` - Address of the counter device
/// * `port` - TCP port of the device (default: 502)
/// * `device_id` - Modbus unit identifier of the device
/// * `timeout_ms` - Timeout wrapping every connect and register read (default: 5000 ms)
/// * `registers` - Input register addresses of the counters
///
/// # Example
///
/// ```
/// use line_oee_monitor::config::{ModbusConfig, RegisterMap};
///
/// let modbus_config = ModbusConfig {
///     host: "10.0.0.175".to_string(),
///     port: 502,
///     device_id: 175,
///     timeout_ms: 5000,
///     registers: RegisterMap::default(),
/// };
/// assert_eq!(modbus_config.socket_address(), "10.0.0.175:502");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// The network address of the counter device.
    ///
    /// Can be an IPv4/IPv6 address or a hostname.
    pub host: String,

    /// The TCP port the device listens on.
    ///
    /// Default value is 502, which is the standard Modbus TCP port.
    pub port: u16,

    /// Modbus unit identifier (slave id) addressed by every request.
    pub device_id: u8,

    /// Timeout applied to every register read, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Register addresses of the line counters.
    #[serde(default)]
    pub registers: RegisterMap,
}

/// Input register addresses of the three line counters.
///
/// The total counter is a 32-bit big-endian value spread over two
/// consecutive registers starting at `total_counter`. The hour and auxiliary
/// counters are single 16-bit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMap {
    /// First register of the 32-bit total production counter
    pub total_counter: u16,
    /// 16-bit hourly counter
    pub hour_counter: u16,
    /// 16-bit auxiliary counter
    pub aux_counter: u16,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl ModbusConfig {
    /// `host:port` string of the device, IPv6 literals in brackets
    pub fn socket_address(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Connect and read timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            total_counter: 6000,
            hour_counter: 6001,
            aux_counter: 6011,
        }
    }
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "10.0.0.175".to_string(),
            port: 502,
            device_id: 175,
            timeout_ms: default_timeout_ms(),
            registers: RegisterMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_host(host: &str) -> ModbusConfig {
        ModbusConfig {
            host: host.to_string(),
            ..ModbusConfig::default()
        }
    }

    #[test]
    fn test_socket_address_brackets_ipv6() {
        assert_eq!(with_host("::1").socket_address(), "[::1]:502");
        assert_eq!(
            with_host("fe80::1:175").socket_address(),
            "[fe80::1:175]:502"
        );
        assert_eq!(with_host("10.0.0.175").socket_address(), "10.0.0.175:502");
        assert_eq!(with_host("plc-line5").socket_address(), "plc-line5:502");
    }

    #[tokio::test]
    async fn test_ipv6_socket_address_resolves() {
        let resolved: Vec<_> = tokio::net::lookup_host(with_host("::1").socket_address())
            .await
            .unwrap()
            .collect();
        assert_eq!(resolved, vec!["[::1]:502".parse().unwrap()]);
    }
}
