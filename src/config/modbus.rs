// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the Modbus TCP link to the robot controller

use serde::{Deserialize, Serialize};

/// Settings for the Modbus TCP connection to the bartending robot.
///
/// The connection manager reads this section fresh every time it opens a new
/// connection, so an update only takes effect on the next reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModbusClientConfig {
    /// Hostname or IP address of the robot controller.
    pub host: String,
    /// TCP port of the Modbus server on the controller (standard: 502).
    pub port: u16,
    /// Modbus unit (slave) identifier.
    pub unit_id: u8,
    /// Per-request timeout in milliseconds. Also bounds connection attempts.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Default for ModbusClientConfig {
    fn default() -> Self {
        Self {
            // Factory address of the robot controller network interface.
            host: "192.168.125.1".to_string(),
            port: 502,
            unit_id: 1,
            timeout_ms: 5000,
        }
    }
}
