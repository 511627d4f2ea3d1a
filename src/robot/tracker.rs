// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-order progress tracking and reset arbitration
//!
//! Two independent channels observe the robot: the status polling endpoint
//! and the push-event loop. Both feed the same shared tracker, which is an
//! explicit state machine (`Idle` → `Preparing` → `Resetting` → `Idle`) so
//! that the two invariants hold structurally:
//!
//! - the reset sequencer is requested at most once per order, no matter which
//!   channel observes `drinkReady` first;
//! - tracking stops only after the robot reports `waitingRecipe` *after* the
//!   drink was ready, never on a stray ready reading from before the order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::registers::{self, StateKey};
use crate::robot::state::RobotState;

/// Tracker shared between the polling and push channels.
pub type SharedTracker = Arc<Mutex<ProgressTracker>>;

/// The order currently being prepared.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOrder {
    pub cocktail_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_ingredients: Option<Vec<String>>,
    pub started_at: DateTime<Utc>,
}

/// Phase of the order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerPhase {
    /// No active order.
    Idle,
    /// The robot is preparing the active order.
    Preparing,
    /// The drink was ready and the reset was requested; waiting for the
    /// robot to report ready again.
    Resetting,
}

/// What the caller must do after feeding a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerAction {
    /// Nothing to do.
    None,
    /// The drink is ready: run the reset sequencer. Issued at most once per
    /// order.
    TriggerReset,
    /// The robot is ready again after the reset; the order is complete and
    /// tracking has stopped.
    OrderComplete,
}

/// State machine computing progress and deciding when to reset.
#[derive(Debug)]
pub struct ProgressTracker {
    phase: TrackerPhase,
    order: Option<ActiveOrder>,
    steps: Vec<StateKey>,
    progress: u8,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: TrackerPhase::Idle,
            order: None,
            steps: Vec::new(),
            progress: 0,
        }
    }

    /// Begin tracking a freshly placed order.
    pub fn start_order(&mut self, cocktail_id: &str, custom_ingredients: Option<Vec<String>>) {
        info!("tracking order for {cocktail_id}");
        self.steps = registers::steps_for(cocktail_id, custom_ingredients.as_deref());
        self.order = Some(ActiveOrder {
            cocktail_id: cocktail_id.to_string(),
            custom_ingredients,
            started_at: Utc::now(),
        });
        self.phase = TrackerPhase::Preparing;
        self.progress = 0;
    }

    /// Adopt a preparation that was already running when the server started
    /// (detected by scanning the trigger block). No effect while an order is
    /// already being tracked.
    pub fn adopt_order(&mut self, cocktail_id: &str) {
        if self.phase != TrackerPhase::Idle {
            return;
        }
        info!("adopting mid-flight preparation of {cocktail_id}");
        self.start_order(cocktail_id, None);
    }

    /// Feed a snapshot from either channel and learn what to do next.
    pub fn observe(&mut self, snapshot: &RobotState) -> TrackerAction {
        match self.phase {
            TrackerPhase::Idle => TrackerAction::None,
            TrackerPhase::Preparing => {
                // Progress never moves backwards within an order, even when a
                // degraded snapshot reports flags all-false.
                self.progress = self.progress.max(self.compute_progress(snapshot));
                if snapshot.drink_ready {
                    self.progress = 100;
                    self.phase = TrackerPhase::Resetting;
                    TrackerAction::TriggerReset
                } else {
                    // A waitingRecipe reading here is a stray leftover from
                    // before the order started; ignore it.
                    TrackerAction::None
                }
            }
            TrackerPhase::Resetting => {
                if snapshot.waiting_recipe {
                    info!("robot ready again, order complete");
                    self.phase = TrackerPhase::Idle;
                    self.order = None;
                    self.steps.clear();
                    self.progress = 0;
                    TrackerAction::OrderComplete
                } else {
                    TrackerAction::None
                }
            }
        }
    }

    /// Preparation progress of the active order, 0..=100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn active_order(&self) -> Option<&ActiveOrder> {
        self.order.as_ref()
    }

    fn compute_progress(&self, snapshot: &RobotState) -> u8 {
        if snapshot.drink_ready {
            return 100;
        }
        if self.steps.is_empty() {
            return 0;
        }
        let completed = self.steps.iter().filter(|&&k| snapshot.flag(k)).count();
        ((completed as f64 / self.steps.len() as f64) * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(f: impl FnOnce(&mut RobotState)) -> RobotState {
        let mut s = RobotState::default();
        f(&mut s);
        s
    }

    #[test]
    fn idle_tracker_reports_zero_progress_and_no_action() {
        let mut tracker = ProgressTracker::new();
        let ready = snapshot(|s| s.drink_ready = true);
        assert_eq!(tracker.observe(&ready), TrackerAction::None);
        assert_eq!(tracker.progress(), 0);
    }

    #[test]
    fn reset_fires_exactly_once_across_both_channels() {
        let mut tracker = ProgressTracker::new();
        tracker.start_order("mojito", None);

        let served = snapshot(|s| s.drink_ready = true);
        // Polling channel sees the ready drink first...
        assert_eq!(tracker.observe(&served), TrackerAction::TriggerReset);
        // ...then the push channel sees the very same state.
        assert_eq!(tracker.observe(&served), TrackerAction::None);
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn tracking_stops_only_after_ready_follows_the_reset() {
        let mut tracker = ProgressTracker::new();
        tracker.start_order("mojito", None);

        // Stray ready reading before the drink is done must not stop tracking.
        let stray_ready = snapshot(|s| s.waiting_recipe = true);
        assert_eq!(tracker.observe(&stray_ready), TrackerAction::None);
        assert!(tracker.active_order().is_some());

        let served = snapshot(|s| s.drink_ready = true);
        assert_eq!(tracker.observe(&served), TrackerAction::TriggerReset);

        // Still resetting: the robot has not reported ready yet.
        assert_eq!(tracker.observe(&served), TrackerAction::None);

        let ready_again = snapshot(|s| s.waiting_recipe = true);
        assert_eq!(tracker.observe(&ready_again), TrackerAction::OrderComplete);
        assert!(tracker.active_order().is_none());
        assert_eq!(tracker.progress(), 0);
    }

    #[test]
    fn progress_follows_the_cocktail_step_list() {
        let mut tracker = ProgressTracker::new();
        // whiskey-rocks: ice, whiskey, drinkReady — three steps.
        tracker.start_order("whiskey-rocks", None);
        assert_eq!(tracker.progress(), 0);

        tracker.observe(&snapshot(|s| s.ice = true));
        assert_eq!(tracker.progress(), 33);

        tracker.observe(&snapshot(|s| {
            s.ice = true;
            s.whiskey = true;
        }));
        assert_eq!(tracker.progress(), 67);

        tracker.observe(&snapshot(|s| s.drink_ready = true));
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn progress_is_monotonic_across_degraded_snapshots() {
        let mut tracker = ProgressTracker::new();
        tracker.start_order("whiskey-rocks", None);

        tracker.observe(&snapshot(|s| s.ice = true));
        assert_eq!(tracker.progress(), 33);

        // A failed read produces an all-false snapshot; progress holds.
        tracker.observe(&RobotState::default());
        assert_eq!(tracker.progress(), 33);
    }

    #[test]
    fn drink_ready_forces_full_progress_regardless_of_step_flags() {
        let mut tracker = ProgressTracker::new();
        tracker.start_order("mojito", None);

        // No individual step was ever observed, only the final flag.
        tracker.observe(&snapshot(|s| s.drink_ready = true));
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn custom_orders_track_their_synthesized_steps() {
        let mut tracker = ProgressTracker::new();
        tracker.start_order(
            "custom",
            Some(vec!["mint".to_string(), "ice".to_string()]),
        );

        // Steps: mint, ice, drinkReady.
        tracker.observe(&snapshot(|s| s.mint = true));
        assert_eq!(tracker.progress(), 33);
    }

    #[test]
    fn adopt_order_does_not_clobber_an_active_order() {
        let mut tracker = ProgressTracker::new();
        tracker.start_order("mojito", None);
        tracker.adopt_order("cuba-libre");
        assert_eq!(
            tracker.active_order().map(|o| o.cocktail_id.as_str()),
            Some("mojito")
        );
    }
}
