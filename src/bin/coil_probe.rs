//! Diagnostic probe dumping the robot's coil map.
//!
//! Connects to the robot (or the simulator), reads every documented coil
//! block and prints each coil with its semantic label. Useful when checking
//! wiring or chasing a stuck trigger.

use anyhow::{Context as _, Result};
use clap::Parser;
use tokio_modbus::client::{tcp, Client, Reader};
use tokio_modbus::Slave;

use rust_barbot::registers::{
    self, COCKTAIL_TRIGGER_COUNT, COCKTAIL_TRIGGER_START, CUP_HOLDER_ADDRESS, DRINK_READY_ADDRESS,
    INGREDIENTS, START_SIGNAL_ADDRESS, STEP_FLAGS_START, SYSTEM_FLAGS_COUNT, SYSTEM_FLAGS_START,
    WAITING_RECIPE_ADDRESS,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dump the bartending robot's coil map")]
struct Args {
    /// Robot controller host
    #[arg(long, default_value = "192.168.125.1")]
    host: String,

    /// Robot controller port
    #[arg(long, default_value_t = 502)]
    port: u16,

    /// Modbus unit id
    #[arg(long, default_value_t = 1)]
    unit_id: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let target = format!("{}:{}", args.host, args.port);
    let socket_addr = tokio::net::lookup_host(&target)
        .await
        .with_context(|| format!("cannot resolve {target}"))?
        .next()
        .with_context(|| format!("no address for {target}"))?;

    let mut ctx = tcp::connect_slave(socket_addr, Slave(args.unit_id))
        .await
        .with_context(|| format!("cannot connect to {target}"))?;
    println!("Connected to {target} (unit id {})", args.unit_id);

    // Step flags, including the stirring/straw flags outside the snapshot block.
    let step_count = INGREDIENTS.len() as u16;
    println!("\nStep flags ({STEP_FLAGS_START}..={}):", STEP_FLAGS_START + step_count - 1);
    let flags = ctx.read_coils(STEP_FLAGS_START, step_count).await??;
    for (ingredient, value) in INGREDIENTS.iter().zip(&flags) {
        println!(
            "  {:>3}  {:<20} {}",
            ingredient.read_address,
            ingredient.label,
            *value as u8
        );
    }

    println!("\nSystem flags ({SYSTEM_FLAGS_START}..={}):", SYSTEM_FLAGS_START + SYSTEM_FLAGS_COUNT - 1);
    let flags = ctx.read_coils(SYSTEM_FLAGS_START, SYSTEM_FLAGS_COUNT).await??;
    let system_labels = [
        (CUP_HOLDER_ADDRESS, "cupHolder"),
        (DRINK_READY_ADDRESS, "drinkReady"),
        (WAITING_RECIPE_ADDRESS, "waitingRecipe"),
    ];
    for ((address, label), value) in system_labels.iter().zip(&flags) {
        println!("  {address:>3}  {label:<20} {}", *value as u8);
    }

    println!("\nStart signal:");
    let flags = ctx.read_coils(START_SIGNAL_ADDRESS, 1).await??;
    println!(
        "  {START_SIGNAL_ADDRESS:>3}  {:<20} {}",
        "start",
        flags.first().copied().unwrap_or(false) as u8
    );

    println!(
        "\nCocktail triggers ({COCKTAIL_TRIGGER_START}..={}):",
        COCKTAIL_TRIGGER_START + COCKTAIL_TRIGGER_COUNT - 1
    );
    let flags = ctx
        .read_coils(COCKTAIL_TRIGGER_START, COCKTAIL_TRIGGER_COUNT)
        .await??;
    for (offset, value) in flags.iter().enumerate() {
        let address = COCKTAIL_TRIGGER_START + offset as u16;
        let label = registers::cocktail_for_trigger(address).unwrap_or("unused");
        println!("  {address:>3}  {label:<20} {}", *value as u8);
    }

    println!("\nIngredient commands (132..=143):");
    let flags = ctx.read_coils(132, step_count).await??;
    for (ingredient, value) in INGREDIENTS.iter().zip(&flags) {
        println!(
            "  {:>3}  {:<20} {}",
            ingredient.write_address,
            ingredient.id,
            *value as u8
        );
    }

    ctx.disconnect().await?;
    Ok(())
}
