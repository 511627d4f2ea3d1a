// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Robot state snapshots
//!
//! The robot state is read in two batched coil reads: the step flag block
//! (32..=41) and the system flag block (90..=92). A snapshot always carries
//! the full key set; a failed read leaves its half all-false so that callers
//! never have to handle a partial snapshot.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::modbus::ConnectionManager;
use crate::registers::{
    StateKey, STEP_FLAGS_COUNT, STEP_FLAGS_START, SYSTEM_FLAGS_COUNT, SYSTEM_FLAGS_START,
};

/// Immutable snapshot of the robot's observable coil state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotState {
    // Step flags (32..=41)
    pub mint: bool,
    pub muddling: bool,
    pub ice: bool,
    pub syrup: bool,
    pub lime: bool,
    pub white_rum: bool,
    pub cognac: bool,
    pub whiskey: bool,
    pub soda: bool,
    pub coke: bool,
    // System flags (90..=92)
    pub cup_holder: bool,
    pub drink_ready: bool,
    pub waiting_recipe: bool,
}

impl RobotState {
    /// Value of the flag behind a semantic key.
    pub fn flag(&self, key: StateKey) -> bool {
        match key {
            StateKey::Mint => self.mint,
            StateKey::Muddling => self.muddling,
            StateKey::Ice => self.ice,
            StateKey::Syrup => self.syrup,
            StateKey::Lime => self.lime,
            StateKey::WhiteRum => self.white_rum,
            StateKey::Cognac => self.cognac,
            StateKey::Whiskey => self.whiskey,
            StateKey::Soda => self.soda,
            StateKey::Coke => self.coke,
            StateKey::CupHolder => self.cup_holder,
            StateKey::DrinkReady => self.drink_ready,
            StateKey::WaitingRecipe => self.waiting_recipe,
        }
    }
}

/// Read a fresh snapshot of the robot state.
///
/// Read failures are logged and the affected half defaults to all-false;
/// the other half is still populated. Callers always receive a complete
/// snapshot.
pub async fn read_robot_state(manager: &ConnectionManager) -> RobotState {
    let mut state = RobotState::default();

    match manager.read_coils(STEP_FLAGS_START, STEP_FLAGS_COUNT).await {
        Ok(flags) => {
            let bit = |i: usize| flags.get(i).copied().unwrap_or(false);
            state.mint = bit(0);
            state.muddling = bit(1);
            state.ice = bit(2);
            state.syrup = bit(3);
            state.lime = bit(4);
            state.white_rum = bit(5);
            state.cognac = bit(6);
            state.whiskey = bit(7);
            state.soda = bit(8);
            state.coke = bit(9);
        }
        Err(err) => {
            warn!(
                "could not read step flags ({}..={}): {err}",
                STEP_FLAGS_START,
                STEP_FLAGS_START + STEP_FLAGS_COUNT - 1
            );
        }
    }

    match manager
        .read_coils(SYSTEM_FLAGS_START, SYSTEM_FLAGS_COUNT)
        .await
    {
        Ok(flags) => {
            let bit = |i: usize| flags.get(i).copied().unwrap_or(false);
            state.cup_holder = bit(0);
            state.drink_ready = bit(1);
            state.waiting_recipe = bit(2);
        }
        Err(err) => {
            warn!(
                "could not read system flags ({}..={}): {err}",
                SYSTEM_FLAGS_START,
                SYSTEM_FLAGS_START + SYSTEM_FLAGS_COUNT - 1
            );
        }
    }

    state
}
