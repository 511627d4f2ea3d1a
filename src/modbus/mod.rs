// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! The bartending robot exposes its state and command interface as plain
//! coils over Modbus TCP (function codes Read Coils and Write Single Coil
//! only — the controller supports neither holding registers nor discrete
//! inputs).
//!
//! ## Key Components
//!
//! - [`ConnectionManager`]: owner of the single shared TCP connection to the
//!   robot, with lazy connect, bounded reconnection and request timeouts.
//! - [`simulator`]: a coil-backed Modbus server standing in for the physical
//!   robot during development and in the integration tests.

pub mod connection;
pub mod simulator;

pub use connection::{ConnectionManager, MAX_RECONNECT_ATTEMPTS};
pub use simulator::{BarBotSimulator, SimulatorState};
