// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Robot state synchronization and command sequencing
//!
//! This module holds the behavior around the register map:
//!
//! - `state`: batched snapshot reads of the robot's coil state
//! - `sequencer`: translates an order into the ordered coil write sequence
//! - `reset`: clears every command coil back to false after a served drink
//! - `monitor`: diffs successive snapshots into discrete transition events
//! - `tracker`: per-order progress and the reset-exactly-once state machine

pub mod monitor;
pub mod reset;
pub mod sequencer;
pub mod state;
pub mod tracker;

pub use monitor::{ChangeDetector, Transition};
pub use reset::{reset_all_addresses, ResetReport};
pub use sequencer::{start_cocktail, start_custom, OrderReceipt};
pub use state::{read_robot_state, RobotState};
pub use tracker::{ActiveOrder, ProgressTracker, SharedTracker, TrackerAction};
