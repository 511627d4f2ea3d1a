//! Standalone bartending robot simulator.
//!
//! Serves the robot's coil map over Modbus TCP and acts out the preparation
//! cycle: when the start signal is raised it drops `waitingRecipe`, walks the
//! commanded ingredient steps raising their in-progress flags, raises
//! `drinkReady`, then waits for the command coils to be cleared before
//! reporting ready again.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;
use tokio::time::sleep;

use rust_barbot::modbus::simulator::{serve, SimulatorState};
use rust_barbot::registers::{
    Ingredient, DRINK_READY_ADDRESS, INGREDIENTS, START_SIGNAL_ADDRESS, WAITING_RECIPE_ADDRESS,
};

/// Cadence at which the behavior loop samples the command coils.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(author, version, about = "Modbus TCP simulator of the bartending robot")]
struct Args {
    /// Address and port to listen on
    #[arg(short, long, default_value = "0.0.0.0:4502")]
    listen: String,

    /// Duration of each simulated preparation step, in milliseconds
    #[arg(long, default_value_t = 2000)]
    step_duration_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let listener = TcpListener::bind(&args.listen).await?;
    let state = SimulatorState::new();

    let behavior = tokio::spawn(run_behavior(
        state.clone(),
        Duration::from_millis(args.step_duration_ms),
    ));

    let result = serve(listener, state).await;
    behavior.abort();
    result
}

/// Act out the robot's preparation cycle against the shared coil store.
async fn run_behavior(state: SimulatorState, step_duration: Duration) {
    loop {
        // Idle until the server raises the start signal.
        while state.coil(START_SIGNAL_ADDRESS) != Some(true) {
            sleep(POLL_INTERVAL).await;
        }

        let steps: Vec<&'static Ingredient> = INGREDIENTS
            .iter()
            .filter(|i| state.coil(i.write_address) == Some(true))
            .collect();
        info!("start signal received, preparing {} steps", steps.len());
        state.set_coil(WAITING_RECIPE_ADDRESS, false);

        // Flags stay raised once a step is done, like on the real controller,
        // until the command coils are reset.
        for ingredient in &steps {
            info!("{}", ingredient.label);
            state.set_coil(ingredient.read_address, true);
            sleep(step_duration).await;
        }

        state.set_coil(DRINK_READY_ADDRESS, true);
        info!("drink ready, waiting for the command coils to be cleared");

        while state.coil(START_SIGNAL_ADDRESS) != Some(false) {
            sleep(POLL_INTERVAL).await;
        }

        for ingredient in INGREDIENTS {
            state.set_coil(ingredient.read_address, false);
        }
        state.set_coil(DRINK_READY_ADDRESS, false);
        state.set_coil(WAITING_RECIPE_ADDRESS, true);
        info!("ready for the next order");
    }
}
