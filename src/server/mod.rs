// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP API server for the bartending robot
//!
//! Thin routing layer over the robot core: ordering, status polling, push
//! events, reset and Modbus configuration endpoints, all under `/api`.

pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{options, routes, Build, Request, Response, Rocket};
use serde::Serialize;

use crate::config::SharedConfig;
use crate::error::RobotError;
use crate::modbus::ConnectionManager;
use crate::robot::{ProgressTracker, SharedTracker};

/// Filesystem location the configuration is persisted to.
pub struct ConfigPath(pub PathBuf);

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

pub type ApiError = status::Custom<Json<ErrorBody>>;

pub fn api_error(status: Status, message: impl Into<String>) -> ApiError {
    status::Custom(
        status,
        Json(ErrorBody {
            error: true,
            message: message.into(),
        }),
    )
}

/// Map a robot error onto the HTTP status contract: busy robot and lost
/// connection are 503, bad input is 400, device/protocol rejections are 500.
pub fn robot_error_response(err: &RobotError) -> ApiError {
    let status = match err {
        RobotError::Busy => Status::ServiceUnavailable,
        RobotError::Connection { .. } => Status::ServiceUnavailable,
        RobotError::Validation { .. } => Status::BadRequest,
        RobotError::Protocol(_) => Status::InternalServerError,
    };
    api_error(status, err.to_string())
}

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// Answers to OPTIONS requests
#[options("/<_path..>")]
async fn options(_path: PathBuf) -> Result<(), std::io::Error> {
    Ok(())
}

/// Assemble the Rocket instance with the robot core managed as shared state.
pub async fn build_rocket(
    figment: Figment,
    config: SharedConfig,
    config_path: PathBuf,
) -> Rocket<Build> {
    let manager = Arc::new(ConnectionManager::new(config.clone()));
    let tracker: SharedTracker = Arc::new(tokio::sync::Mutex::new(ProgressTracker::new()));

    rocket::custom(figment)
        .attach(CORS)
        .mount("/", routes![options])
        .mount(
            "/api",
            routes![
                routes::status,
                routes::order_cocktail,
                routes::order_custom,
                routes::reset_addresses,
                routes::initial_state,
                routes::events,
                routes::get_modbus_config,
                routes::update_modbus_config,
                routes::health,
            ],
        )
        .manage(manager)
        .manage(tracker)
        .manage(config)
        .manage(ConfigPath(config_path))
}
