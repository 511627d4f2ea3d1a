//! Shared helpers for the integration tests: an in-process robot simulator
//! and connection managers pointed at it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use rust_barbot::config::{Config, SharedConfig};
use rust_barbot::modbus::simulator::{serve, SimulatorState};
use rust_barbot::modbus::ConnectionManager;

/// Start the robot simulator on an ephemeral port.
///
/// The returned state handle shares the coils with the running server, so
/// tests can prime flags and inspect writes. Aborting the handle stops it.
pub async fn spawn_simulator() -> (SocketAddr, SimulatorState, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind simulator listener");
    let addr = listener.local_addr().expect("simulator local addr");
    let state = SimulatorState::new();

    let server_state = state.clone();
    let handle = tokio::spawn(async move {
        let _ = serve(listener, server_state).await;
    });

    // Let the accept loop come up before the first client connects.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, state, handle)
}

/// Configuration pointing the Modbus client at `addr`, with a short timeout
/// so failure tests stay fast.
pub fn shared_config_for(addr: SocketAddr) -> SharedConfig {
    let mut config = Config::default();
    config.modbus.host = addr.ip().to_string();
    config.modbus.port = addr.port();
    config.modbus.timeout_ms = 1000;
    Arc::new(RwLock::new(config))
}

pub fn manager_for(addr: SocketAddr) -> ConnectionManager {
    ConnectionManager::new(shared_config_for(addr))
}

/// An address nothing listens on (bound once, then released).
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("throwaway local addr");
    drop(listener);
    addr
}
