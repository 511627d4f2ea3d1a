// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Command sequencer
//!
//! Translates an order into the ordered coil write sequence: ingredient
//! commands in recipe order, then the cocktail trigger, then the global start
//! signal, with a fixed inter-write delay so the robot link is never
//! saturated. A failed write aborts the sequence; writes already issued are
//! not rolled back because the physical side effects are irreversible — the
//! robot is brought back to a clean state by the reset sequencer.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::sleep;

use crate::error::RobotError;
use crate::modbus::ConnectionManager;
use crate::registers::{
    self, CUSTOM_COCKTAIL_ID, CUSTOM_TRIGGER_ADDRESS, START_SIGNAL_ADDRESS,
    WAITING_RECIPE_ADDRESS,
};

/// Pause between consecutive coil writes.
pub const WRITE_DELAY: Duration = Duration::from_millis(50);

/// Summary of an accepted order, returned to the HTTP layer.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub cocktail_id: String,
    /// Ingredient command writes issued, excluding trigger and start.
    pub ingredients_written: usize,
}

/// Start a predefined cocktail.
///
/// Fails with [`RobotError::Busy`] when the robot is not waiting for a recipe,
/// before any coil is written.
pub async fn start_cocktail(
    manager: &ConnectionManager,
    cocktail_id: &str,
) -> Result<OrderReceipt, RobotError> {
    let cocktail = registers::cocktail(cocktail_id).ok_or_else(|| {
        RobotError::validation(format!("Cocktail {cocktail_id} not found"))
    })?;

    ensure_robot_ready(manager).await?;

    info!("writing ingredients for {}", cocktail.name);
    let written = run_sequence(manager, cocktail.recipe, cocktail.trigger_address).await?;

    Ok(OrderReceipt {
        cocktail_id: cocktail.id.to_string(),
        ingredients_written: written,
    })
}

/// Start a custom drink from a caller supplied ingredient selection.
///
/// Rejects an empty or fully unknown selection before any I/O is performed.
pub async fn start_custom(
    manager: &ConnectionManager,
    ingredient_ids: &[String],
) -> Result<OrderReceipt, RobotError> {
    if ingredient_ids.is_empty() {
        return Err(RobotError::validation("No ingredients selected"));
    }

    let order = registers::custom_cocktail(ingredient_ids);
    if order.recipe.is_empty() {
        return Err(RobotError::validation(
            "None of the selected ingredients are available",
        ));
    }

    ensure_robot_ready(manager).await?;

    info!(
        "writing ingredients for custom drink ({} selected, {} writes)",
        ingredient_ids.len(),
        order.recipe.len()
    );
    let written = run_sequence(manager, &order.recipe, CUSTOM_TRIGGER_ADDRESS).await?;

    Ok(OrderReceipt {
        cocktail_id: CUSTOM_COCKTAIL_ID.to_string(),
        ingredients_written: written,
    })
}

/// Pre-flight readiness check on the waiting-recipe coil.
///
/// A `false` reading means the robot is busy and the order is refused before
/// anything is written. A failed reading must not block a legitimate order:
/// intermittent read errors are logged and the sequence proceeds.
async fn ensure_robot_ready(manager: &ConnectionManager) -> Result<(), RobotError> {
    match manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await {
        Ok(flags) => {
            let waiting_recipe = flags.first().copied().unwrap_or(false);
            debug!(
                "robot status check: coil {WAITING_RECIPE_ADDRESS} (waitingRecipe) = {}",
                waiting_recipe as u8
            );
            if !waiting_recipe {
                return Err(RobotError::Busy);
            }
            Ok(())
        }
        Err(err) => {
            warn!(
                "could not read robot status at coil {WAITING_RECIPE_ADDRESS}: {err}; \
                 continuing with the order"
            );
            Ok(())
        }
    }
}

/// Issue the ingredient writes, the trigger write and the start write,
/// strictly in order with the inter-write delay.
async fn run_sequence(
    manager: &ConnectionManager,
    ingredient_writes: &[u16],
    trigger_address: u16,
) -> Result<usize, RobotError> {
    let mut written = 0;
    for &address in ingredient_writes {
        manager.write_coil(address, true).await?;
        debug!("ingredient coil {address} = 1");
        written += 1;
        sleep(WRITE_DELAY).await;
    }

    manager.write_coil(trigger_address, true).await?;
    debug!("trigger coil {trigger_address} = 1");
    sleep(WRITE_DELAY).await;

    manager.write_coil(START_SIGNAL_ADDRESS, true).await?;
    info!("start signal issued at coil {START_SIGNAL_ADDRESS}");

    Ok(written)
}
