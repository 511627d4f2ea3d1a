// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Typed errors surfaced by the robot control core

use thiserror::Error;
use tokio_modbus::ExceptionCode;

/// Errors produced while talking to the bartending robot.
#[derive(Debug, Error)]
pub enum RobotError {
    /// Transport-level failure: refused, timed out or unreachable.
    #[error("{message}")]
    Connection { message: String },

    /// The robot is not waiting for a recipe and cannot accept an order.
    #[error("Robot is busy preparing another drink. Please wait.")]
    Busy,

    /// The device rejected the function, address or value
    /// (Modbus exception codes 1-4).
    #[error("Modbus device rejected the request: {0:?}")]
    Protocol(ExceptionCode),

    /// Bad caller input, e.g. an unknown cocktail id or an empty
    /// ingredient selection.
    #[error("{message}")]
    Validation { message: String },
}

impl RobotError {
    pub fn connection(message: impl Into<String>) -> Self {
        RobotError::Connection {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        RobotError::Validation {
            message: message.into(),
        }
    }
}
