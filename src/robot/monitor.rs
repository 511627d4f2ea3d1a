// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Change detection over successive robot state snapshots
//!
//! Each broadcast session (one per push-event subscriber) owns its own
//! detector, so a transition fires exactly once per session and sessions
//! never affect each other.

use log::debug;

use crate::error::RobotError;
use crate::modbus::ConnectionManager;
use crate::registers::{self, COCKTAIL_TRIGGER_COUNT, COCKTAIL_TRIGGER_START};
use crate::robot::state::RobotState;

/// Discrete transition between two successive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `waitingRecipe` went true → false: the robot accepted an order.
    PreparationStarted,
    /// `drinkReady` went false → true: the drink is finished.
    DrinkReady,
    /// `waitingRecipe` went false → true: the robot is idle again
    /// (after the command coils were reset).
    RobotReady,
}

/// Diffs successive snapshots into transitions.
///
/// The first observed snapshot only seeds the baseline and never emits.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<RobotState>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next snapshot and collect the transitions it triggered.
    pub fn observe(&mut self, next: &RobotState) -> Vec<Transition> {
        let mut transitions = Vec::new();

        if let Some(last) = &self.last {
            if last.waiting_recipe && !next.waiting_recipe {
                debug!("preparation started detected");
                transitions.push(Transition::PreparationStarted);
            }
            if !last.drink_ready && next.drink_ready {
                debug!("drink ready detected");
                transitions.push(Transition::DrinkReady);
            }
            if !last.waiting_recipe && next.waiting_recipe {
                debug!("robot returned to ready state");
                transitions.push(Transition::RobotReady);
            }
        }

        self.last = Some(*next);
        transitions
    }
}

/// Scan the cocktail trigger block for the set bit and resolve it to a
/// cocktail id. `None` when no trigger is raised.
pub async fn detect_active_cocktail(
    manager: &ConnectionManager,
) -> Result<Option<&'static str>, RobotError> {
    let triggers = manager
        .read_coils(COCKTAIL_TRIGGER_START, COCKTAIL_TRIGGER_COUNT)
        .await?;

    Ok(triggers
        .iter()
        .position(|&set| set)
        .and_then(|index| registers::cocktail_for_trigger(COCKTAIL_TRIGGER_START + index as u16)))
}
