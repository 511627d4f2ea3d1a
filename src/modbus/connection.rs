// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared Modbus TCP connection to the robot controller
//!
//! The process owns exactly one connection to the robot. The link lifecycle is
//! an explicit tagged state (`Disconnected`/`Connected`) behind an async mutex:
//! concurrent callers queue on the same connect attempt instead of racing, and
//! requests serialize naturally on the wire, which is all the concurrency
//! control the robot link needs.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Client, Context, Reader, Writer};
use tokio_modbus::Slave;

use crate::config::{ModbusClientConfig, SharedConfig};
use crate::error::RobotError;

/// Consecutive failed connection attempts tolerated before the manager fails
/// fast until explicitly reset.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Lifecycle of the shared robot link.
enum LinkState {
    Disconnected { consecutive_failures: u32 },
    Connected(Context),
}

/// Owner of the single shared Modbus TCP connection.
///
/// Connects lazily on first use, reading the `modbus` configuration section
/// fresh so that configuration updates take effect on the next reconnect.
pub struct ConnectionManager {
    link: Mutex<LinkState>,
    config: SharedConfig,
}

impl ConnectionManager {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            link: Mutex::new(LinkState::Disconnected {
                consecutive_failures: 0,
            }),
            config,
        }
    }

    /// Whether a connection to the robot is currently open.
    pub async fn is_connected(&self) -> bool {
        matches!(*self.link.lock().await, LinkState::Connected(_))
    }

    /// Drop the current connection and failure counter. The next request
    /// connects with the configuration in force at that time. Never fails.
    pub async fn force_reconnect(&self) {
        info!("forcing reconnection with current configuration");
        let mut link = self.link.lock().await;
        if let LinkState::Connected(ctx) = &mut *link {
            if let Err(err) = ctx.disconnect().await {
                debug!("error while closing robot link: {err}");
            }
        }
        *link = LinkState::Disconnected {
            consecutive_failures: 0,
        };
    }

    /// Clear the failure counter so the next request may retry, without
    /// touching an open connection.
    pub async fn reset_attempts(&self) {
        let mut link = self.link.lock().await;
        if let LinkState::Disconnected {
            consecutive_failures,
        } = &mut *link
        {
            *consecutive_failures = 0;
        }
    }

    /// Read `count` coils starting at `address`.
    pub async fn read_coils(&self, address: u16, count: u16) -> Result<Vec<bool>, RobotError> {
        let mut link = self.link.lock().await;
        let request_timeout = self.ensure_connected(&mut *link).await?;
        let LinkState::Connected(ctx) = &mut *link else {
            return Err(RobotError::connection("robot link not established"));
        };

        match timeout(request_timeout, ctx.read_coils(address, count)).await {
            Err(_) => {
                *link = Self::drop_link();
                Err(RobotError::connection(format!(
                    "timed out reading {count} coils at {address}; robot may be busy or unreachable"
                )))
            }
            Ok(Err(err)) => {
                *link = Self::drop_link();
                Err(RobotError::connection(format!(
                    "failed to read coils at {address}: {err}"
                )))
            }
            Ok(Ok(Err(exception))) => Err(RobotError::Protocol(exception)),
            Ok(Ok(Ok(mut coils))) => {
                // Responses are byte padded; trim to the requested count.
                coils.truncate(count as usize);
                Ok(coils)
            }
        }
    }

    /// Write a single coil at `address`.
    pub async fn write_coil(&self, address: u16, value: bool) -> Result<(), RobotError> {
        let mut link = self.link.lock().await;
        let request_timeout = self.ensure_connected(&mut *link).await?;
        let LinkState::Connected(ctx) = &mut *link else {
            return Err(RobotError::connection("robot link not established"));
        };

        match timeout(request_timeout, ctx.write_single_coil(address, value)).await {
            Err(_) => {
                *link = Self::drop_link();
                Err(RobotError::connection(format!(
                    "timed out writing coil {address}; robot may be busy or unreachable"
                )))
            }
            Ok(Err(err)) => {
                *link = Self::drop_link();
                Err(RobotError::connection(format!(
                    "failed to write coil {address}: {err}"
                )))
            }
            Ok(Ok(Err(exception))) => Err(RobotError::Protocol(exception)),
            Ok(Ok(Ok(()))) => Ok(()),
        }
    }

    /// Ensure the link is connected, connecting lazily when needed.
    ///
    /// Returns the request timeout of the configuration the link was opened
    /// with. Fails fast once the failure cap is reached; a successful connect
    /// clears the counter.
    async fn ensure_connected(&self, link: &mut LinkState) -> Result<Duration, RobotError> {
        let modbus_config = self.config.read().await.modbus.clone();

        if let LinkState::Disconnected {
            consecutive_failures,
        } = link
        {
            if *consecutive_failures >= MAX_RECONNECT_ATTEMPTS {
                return Err(RobotError::connection(format!(
                    "Failed to connect after {MAX_RECONNECT_ATTEMPTS} attempts. Please check robot connection."
                )));
            }
            match Self::connect(&modbus_config).await {
                Ok(ctx) => *link = LinkState::Connected(ctx),
                Err(err) => {
                    *consecutive_failures += 1;
                    warn!(
                        "connection attempt {} of {} failed: {err}",
                        consecutive_failures, MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(err);
                }
            }
        }

        Ok(Duration::from_millis(modbus_config.timeout_ms))
    }

    /// Open a Modbus TCP connection to the configured robot controller.
    async fn connect(config: &ModbusClientConfig) -> Result<Context, RobotError> {
        let target = format!("{}:{}", config.host, config.port);
        info!("attempting connection to {target} (unit id: {})", config.unit_id);

        let socket_addr = tokio::net::lookup_host(&target)
            .await
            .map_err(|err| {
                RobotError::connection(format!(
                    "Network unreachable. Cannot resolve {target}: {err}"
                ))
            })?
            .next()
            .ok_or_else(|| {
                RobotError::connection(format!("Network unreachable. No address for {target}"))
            })?;

        let connect_timeout = Duration::from_millis(config.timeout_ms);
        match timeout(
            connect_timeout,
            tcp::connect_slave(socket_addr, Slave(config.unit_id)),
        )
        .await
        {
            Err(_) => Err(RobotError::connection(
                "Connection timeout. Robot may be busy or unreachable.",
            )),
            Ok(Err(err)) => Err(RobotError::connection(format!(
                "Robot is offline. Unable to connect to {target}: {err}"
            ))),
            Ok(Ok(ctx)) => {
                info!("connected to {target}");
                Ok(ctx)
            }
        }
    }

    fn drop_link() -> LinkState {
        warn!("robot link lost, dropping connection");
        LinkState::Disconnected {
            consecutive_failures: 0,
        }
    }
}
