// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Coil-backed Modbus server simulating the bartending robot
//!
//! Serves the exact coil map of the physical robot so the application can be
//! developed and tested without it. Only Read Coils and Write Single Coil are
//! implemented, matching the capabilities of the real controller; everything
//! else answers with an illegal-function exception.

use std::{
    collections::HashMap,
    future,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use log::{error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::registers::{
    COCKTAIL_TRIGGER_COUNT, COCKTAIL_TRIGGER_START, START_SIGNAL_ADDRESS, STEP_FLAGS_START,
    SYSTEM_FLAGS_START, WAITING_RECIPE_ADDRESS,
};

/// Shared coil store of the simulated robot.
///
/// Cloning the state shares the underlying coils, so tests keep a handle to
/// inspect and prime the device while the server owns its own clone.
#[derive(Debug, Clone)]
pub struct SimulatorState {
    coils: Arc<Mutex<HashMap<u16, bool>>>,
    write_log: Arc<Mutex<Vec<(u16, bool)>>>,
}

impl SimulatorState {
    /// A fresh robot: every coil false except `waitingRecipe`.
    pub fn new() -> Self {
        let mut coils = HashMap::new();
        // Ingredient in-progress flags (32..=43).
        for addr in STEP_FLAGS_START..=43 {
            coils.insert(addr, false);
        }
        // System flags (90..=92).
        for addr in SYSTEM_FLAGS_START..=WAITING_RECIPE_ADDRESS {
            coils.insert(addr, false);
        }
        coils.insert(WAITING_RECIPE_ADDRESS, true);
        // Start signal.
        coils.insert(START_SIGNAL_ADDRESS, false);
        // Cocktail triggers (100..=107).
        for addr in COCKTAIL_TRIGGER_START..COCKTAIL_TRIGGER_START + COCKTAIL_TRIGGER_COUNT {
            coils.insert(addr, false);
        }
        // Ingredient command writes (132..=143).
        for addr in 132..=143 {
            coils.insert(addr, false);
        }

        Self {
            coils: Arc::new(Mutex::new(coils)),
            write_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Current value of a coil, `None` for unmapped addresses.
    pub fn coil(&self, address: u16) -> Option<bool> {
        self.coils.lock().unwrap().get(&address).copied()
    }

    /// Prime a coil from the robot side (e.g. raise a step flag).
    pub fn set_coil(&self, address: u16, value: bool) {
        self.coils.lock().unwrap().insert(address, value);
    }

    /// Every Write Single Coil the simulator accepted, in wire order.
    pub fn writes(&self) -> Vec<(u16, bool)> {
        self.write_log.lock().unwrap().clone()
    }

    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Modbus service answering with the simulated robot's coils.
pub struct BarBotSimulator {
    state: SimulatorState,
}

impl BarBotSimulator {
    pub fn new(state: SimulatorState) -> Self {
        Self { state }
    }
}

impl tokio_modbus::server::Service for BarBotSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadCoils(addr, cnt) => {
                coil_read(&self.state.coils.lock().unwrap(), addr, cnt).map(Response::ReadCoils)
            }
            Request::WriteSingleCoil(addr, value) => {
                self.state.write_log.lock().unwrap().push((addr, value));
                coil_write(&mut self.state.coils.lock().unwrap(), addr, value)
                    .map(|_| Response::WriteSingleCoil(addr, value))
            }
            _ => {
                error!(
                    "SERVER: Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };
        future::ready(res)
    }
}

/// Helper function implementing reading coils from a HashMap.
fn coil_read(coils: &HashMap<u16, bool>, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
    let mut response_values = vec![false; cnt.into()];
    for i in 0..cnt {
        let coil_addr = addr + i;
        if let Some(value) = coils.get(&coil_addr) {
            response_values[i as usize] = *value;
        } else {
            error!("SERVER: Exception::IllegalDataAddress at {coil_addr}");
            return Err(ExceptionCode::IllegalDataAddress);
        }
    }

    Ok(response_values)
}

/// Write a single coil, rejecting addresses outside the robot's map.
fn coil_write(coils: &mut HashMap<u16, bool>, addr: u16, value: bool) -> Result<(), ExceptionCode> {
    match coils.get_mut(&addr) {
        Some(coil) => {
            *coil = value;
            Ok(())
        }
        None => {
            error!("SERVER: Exception::IllegalDataAddress at {addr}");
            Err(ExceptionCode::IllegalDataAddress)
        }
    }
}

/// Serve the simulated robot on an already bound listener.
pub async fn serve(listener: TcpListener, state: SimulatorState) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!("robot simulator listening on {local_addr}");

    let server = Server::new(listener);
    let new_service = move |_socket_addr: SocketAddr| Ok(Some(BarBotSimulator::new(state.clone())));
    let on_connected = move |stream, socket_addr| {
        let new_service = new_service.clone();
        async move { accept_tcp_connection(stream, socket_addr, new_service) }
    };
    let on_process_error = |err| {
        error!("simulator connection error: {err}");
    };

    server.serve(&on_connected, on_process_error).await?;
    Ok(())
}
