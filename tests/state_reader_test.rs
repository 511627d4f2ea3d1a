//! Snapshot reads and connection lifecycle against the simulator.

mod common;

use rust_barbot::modbus::MAX_RECONNECT_ATTEMPTS;
use rust_barbot::registers::{DRINK_READY_ADDRESS, STEP_FLAGS_START, WAITING_RECIPE_ADDRESS};
use rust_barbot::robot::{read_robot_state, RobotState};

#[tokio::test]
async fn snapshot_reflects_the_simulator_coils() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let manager = common::manager_for(addr);

    sim.set_coil(STEP_FLAGS_START, true); // mint
    sim.set_coil(DRINK_READY_ADDRESS, true);

    let state = read_robot_state(&manager).await;
    assert!(state.mint);
    assert!(state.drink_ready);
    assert!(state.waiting_recipe); // fresh simulator default
    assert!(!state.ice);
    assert!(!state.cup_holder);
    assert!(manager.is_connected().await);

    server.abort();
}

#[tokio::test]
async fn snapshot_degrades_to_all_false_without_a_robot() {
    let manager = common::manager_for(common::dead_addr().await);

    let state = read_robot_state(&manager).await;
    assert_eq!(state, RobotState::default());
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn failure_cap_fails_fast_until_attempts_are_reset() {
    let manager = common::manager_for(common::dead_addr().await);

    for _ in 0..MAX_RECONNECT_ATTEMPTS {
        let err = manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await.unwrap_err();
        assert!(!err.to_string().contains("attempts"), "{err}");
    }

    // The cap is reached: no further connect attempt is made.
    let err = manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await.unwrap_err();
    assert!(err.to_string().contains("after 3 attempts"), "{err}");

    manager.reset_attempts().await;
    let err = manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await.unwrap_err();
    assert!(!err.to_string().contains("attempts"), "{err}");
}

#[tokio::test]
async fn force_reconnect_drops_and_reopens_the_link() {
    let (addr, _sim, server) = common::spawn_simulator().await;
    let manager = common::manager_for(addr);

    assert!(manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await.is_ok());
    assert!(manager.is_connected().await);

    manager.force_reconnect().await;
    assert!(!manager.is_connected().await);

    // The next request reconnects lazily.
    let flags = manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await.unwrap();
    assert_eq!(flags, vec![true]);
    assert!(manager.is_connected().await);

    server.abort();
}

#[tokio::test]
async fn read_is_trimmed_to_the_requested_count() {
    let (addr, _sim, server) = common::spawn_simulator().await;
    let manager = common::manager_for(addr);

    // 3 coils cross a byte boundary in the response encoding.
    let flags = manager.read_coils(90, 3).await.unwrap();
    assert_eq!(flags.len(), 3);

    server.abort();
}
