// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reset sequencer
//!
//! Clears every command coil (cocktail triggers, ingredient commands, start
//! signal) back to false once a drink has been served. Individual write
//! failures are logged and skipped so the traversal always completes, which
//! makes the routine safe to call speculatively and idempotent.

use log::{debug, error, info};
use tokio::time::sleep;

use crate::modbus::ConnectionManager;
use crate::registers::{COCKTAIL_TRIGGER_COUNT, COCKTAIL_TRIGGER_START, INGREDIENTS, START_SIGNAL_ADDRESS};
use crate::robot::sequencer::WRITE_DELAY;

/// Outcome of a reset traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetReport {
    /// Coils the traversal attempted to clear.
    pub attempted: usize,
    /// Coils whose write failed (logged, never aborting the traversal).
    pub failed: usize,
}

impl ResetReport {
    /// True when not a single coil could be cleared, i.e. the robot link is
    /// down entirely.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

/// Write `false` to every cocktail trigger, every ingredient command coil and
/// the start signal.
pub async fn reset_all_addresses(manager: &ConnectionManager) -> ResetReport {
    info!("resetting all command coils");
    let mut report = ResetReport::default();

    let triggers = COCKTAIL_TRIGGER_START..COCKTAIL_TRIGGER_START + COCKTAIL_TRIGGER_COUNT;
    let ingredient_writes = INGREDIENTS.iter().map(|i| i.write_address);
    let addresses = triggers
        .chain(ingredient_writes)
        .chain(std::iter::once(START_SIGNAL_ADDRESS));

    for address in addresses {
        report.attempted += 1;
        match manager.write_coil(address, false).await {
            Ok(()) => debug!("coil {address} = 0"),
            Err(err) => {
                report.failed += 1;
                error!("failed to reset coil {address}: {err}");
            }
        }
        sleep(WRITE_DELAY).await;
    }

    info!(
        "reset complete: {} coils cleared, {} failed",
        report.attempted - report.failed,
        report.failed
    );
    report
}
