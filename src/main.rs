// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Entry point of the bartending robot web server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use rocket::config::LogLevel;
use rocket::figment::Figment;
use tokio::sync::RwLock;

use rust_barbot::config::{Config, SharedConfig};
use rust_barbot::server::build_rocket;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Web server controlling the bartending robot over Modbus TCP"
)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "barbot.yaml")]
    config: PathBuf,

    /// Override the HTTP listen address from the configuration file
    #[arg(long)]
    web_address: Option<String>,

    /// Override the HTTP listen port from the configuration file
    #[arg(long)]
    web_port: Option<u16>,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.web_port, args.web_address);

    info!(
        "starting {} on {}:{}",
        config.server.name, config.server.address, config.server.port
    );

    let figment = Figment::from(rocket::Config::default())
        .merge((
            "ident",
            format!("BarBotServer/{}", env!("CARGO_PKG_VERSION")),
        ))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("log_level", LogLevel::Normal));

    let shared: SharedConfig = Arc::new(RwLock::new(config));
    let _ = build_rocket(figment, shared, args.config)
        .await
        .launch()
        .await?;

    Ok(())
}
