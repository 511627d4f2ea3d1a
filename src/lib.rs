// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # rust-barbot
//!
//! Web application server for a cocktail-making robot controlled over
//! Modbus TCP. The robot exposes its whole interface as coils: step flags it
//! raises while working, system flags (cup holder, drink ready, waiting
//! recipe), cocktail triggers and ingredient command coils the server writes.
//!
//! ## Architecture
//!
//! - [`registers`]: the coil map, the cocktail menu and custom drink synthesis
//! - [`modbus`]: the shared robot connection and a simulator for development
//! - [`robot`]: state snapshots, command/reset sequencing, change detection
//!   and per-order progress tracking
//! - [`server`]: the Rocket HTTP API (`/api`), including the SSE event stream
//! - [`config`]: YAML configuration with JSON-schema validation

pub mod config;
pub mod error;
pub mod modbus;
pub mod registers;
pub mod robot;
pub mod server;

pub use error::RobotError;
