// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! API routes of the bartending robot server
//!
//! Status reads never fail toward the caller: a lost robot link degrades to
//! `isConnected: false` with a default snapshot. Both the polling endpoint and
//! the push-event loop feed the shared progress tracker, which arbitrates the
//! reset so it runs exactly once per served drink no matter which channel saw
//! the ready flag first.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rocket::http::Status;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::{get, post, Shutdown, State};
use serde::{Deserialize, Serialize};
use tokio::time::{interval, sleep};

use crate::config::{Config, ModbusClientConfig, SharedConfig};
use crate::modbus::ConnectionManager;
use crate::registers::{self, START_SIGNAL_ADDRESS, WAITING_RECIPE_ADDRESS};
use crate::robot::monitor::{detect_active_cocktail, ChangeDetector, Transition};
use crate::robot::sequencer::WRITE_DELAY;
use crate::robot::{
    read_robot_state, reset_all_addresses, start_cocktail, start_custom, RobotState,
    SharedTracker, TrackerAction,
};
use crate::server::{api_error, robot_error_response, ApiError, ConfigPath};

/// Cadence of the push-event channel.
const EVENT_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_connected: bool,
    pub robot_state: RobotState,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_cocktail_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    pub message: String,
    pub cocktail_id: String,
    pub ingredients_written: usize,
}

#[derive(Debug, Deserialize)]
pub struct CustomOrderRequest {
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialStateResponse {
    pub robot_ready: bool,
    pub active_cocktail_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModbusConfigResponse {
    pub success: bool,
    pub config: ModbusClientConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModbusConfigRequest {
    pub host: String,
    pub port: u16,
    pub unit_id: Option<u8>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthModbus {
    pub connected: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub app: String,
    pub modbus: HealthModbus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct TimestampPayload {
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateUpdatePayload {
    robot_state: RobotState,
    progress: u8,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreparationStartedPayload {
    cocktail_id: Option<&'static str>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    message: String,
    timestamp: DateTime<Utc>,
}

fn now_payload() -> TimestampPayload {
    TimestampPayload {
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Poll the robot state. Never errors: a lost connection degrades to a
/// default-false snapshot with `isConnected: false`.
#[get("/status")]
pub async fn status(
    manager: &State<Arc<ConnectionManager>>,
    tracker: &State<SharedTracker>,
) -> Json<StatusResponse> {
    let robot_state = read_robot_state(manager).await;
    let is_connected = manager.is_connected().await;

    let (action, progress, active_cocktail_id) = {
        let mut tracker = tracker.lock().await;
        let action = if is_connected {
            tracker.observe(&robot_state)
        } else {
            TrackerAction::None
        };
        (
            action,
            tracker.progress(),
            tracker.active_order().map(|o| o.cocktail_id.clone()),
        )
    };

    if action == TrackerAction::TriggerReset {
        info!("drink ready observed on the polling channel, resetting command coils");
        reset_all_addresses(manager).await;
    }

    Json(StatusResponse {
        is_connected,
        robot_state,
        progress,
        active_cocktail_id,
        timestamp: Utc::now(),
    })
}

/// Order a predefined cocktail.
#[post("/cocktails/<id>")]
pub async fn order_cocktail(
    id: &str,
    manager: &State<Arc<ConnectionManager>>,
    tracker: &State<SharedTracker>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Some(cocktail) = registers::cocktail(id) else {
        return Err(api_error(
            Status::NotFound,
            format!("Cocktail {id} not found"),
        ));
    };

    match start_cocktail(manager, id).await {
        Ok(receipt) => {
            tracker.lock().await.start_order(&receipt.cocktail_id, None);
            Ok(Json(OrderResponse {
                success: true,
                message: format!("Started preparing {}", cocktail.name),
                cocktail_id: receipt.cocktail_id,
                ingredients_written: receipt.ingredients_written,
            }))
        }
        Err(err) => Err(robot_error_response(&err)),
    }
}

/// Order a custom drink assembled from the supplied ingredient selection.
#[post("/cocktails/custom", data = "<request>")]
pub async fn order_custom(
    request: Json<CustomOrderRequest>,
    manager: &State<Arc<ConnectionManager>>,
    tracker: &State<SharedTracker>,
) -> Result<Json<OrderResponse>, ApiError> {
    match start_custom(manager, &request.ingredients).await {
        Ok(receipt) => {
            tracker
                .lock()
                .await
                .start_order(&receipt.cocktail_id, Some(request.ingredients.clone()));
            Ok(Json(OrderResponse {
                success: true,
                message: "Custom cocktail order placed".to_string(),
                cocktail_id: receipt.cocktail_id,
                ingredients_written: receipt.ingredients_written,
            }))
        }
        Err(err) => Err(robot_error_response(&err)),
    }
}

/// Clear every command coil back to false. Individual write failures never
/// abort the traversal; the route only errors when nothing could be written.
#[post("/reset-addresses")]
pub async fn reset_addresses(
    manager: &State<Arc<ConnectionManager>>,
) -> Result<Json<ResetResponse>, ApiError> {
    let report = reset_all_addresses(manager).await;
    if report.all_failed() {
        return Err(api_error(
            Status::InternalServerError,
            "Failed to reset addresses: robot connection lost",
        ));
    }

    Ok(Json(ResetResponse {
        success: true,
        message: "All addresses reset successfully".to_string(),
    }))
}

/// Check the robot state on application load: either confirm readiness (and
/// clear a stale start signal) or report the preparation already in flight.
#[get("/initial-state")]
pub async fn initial_state(
    manager: &State<Arc<ConnectionManager>>,
    tracker: &State<SharedTracker>,
) -> Result<Json<InitialStateResponse>, ApiError> {
    let waiting_recipe = match manager.read_coils(WAITING_RECIPE_ADDRESS, 1).await {
        Ok(flags) => flags.first().copied().unwrap_or(false),
        Err(err) => {
            // Clear the failure counter so the next request can try again.
            manager.reset_attempts().await;
            return Err(api_error(Status::InternalServerError, err.to_string()));
        }
    };

    if waiting_recipe {
        sleep(WRITE_DELAY).await;
        if let Err(err) = manager.write_coil(START_SIGNAL_ADDRESS, false).await {
            warn!("could not clear stale start signal: {err}");
        }
        return Ok(Json(InitialStateResponse {
            robot_ready: true,
            active_cocktail_id: None,
            message: "Robot ready to receive orders".to_string(),
        }));
    }

    match detect_active_cocktail(manager).await {
        Ok(Some(cocktail_id)) => {
            tracker.lock().await.adopt_order(cocktail_id);
            Ok(Json(InitialStateResponse {
                robot_ready: false,
                active_cocktail_id: Some(cocktail_id.to_string()),
                message: format!("Robot is preparing {cocktail_id}"),
            }))
        }
        Ok(None) => {
            warn!("robot busy but no active cocktail detected");
            Ok(Json(InitialStateResponse {
                robot_ready: false,
                active_cocktail_id: None,
                message: "Robot in transitional state".to_string(),
            }))
        }
        Err(err) => {
            manager.reset_attempts().await;
            Err(api_error(Status::InternalServerError, err.to_string()))
        }
    }
}

/// Server-Sent Events stream of robot state updates and transitions.
///
/// Every subscriber gets its own change-detection session. Dropping the
/// stream (client disconnect) cancels the polling loop immediately.
#[get("/events")]
pub fn events(
    manager: &State<Arc<ConnectionManager>>,
    tracker: &State<SharedTracker>,
    mut end: Shutdown,
) -> EventStream![] {
    let manager = manager.inner().clone();
    let tracker = tracker.inner().clone();

    EventStream! {
        yield Event::json(&now_payload()).event("connected");

        let mut detector = ChangeDetector::new();
        let mut timer = interval(EVENT_POLL_INTERVAL);

        loop {
            select! {
                _ = &mut end => break,
                _ = timer.tick() => {}
            }

            let snapshot = read_robot_state(&manager).await;
            if !manager.is_connected().await {
                yield Event::json(&ErrorPayload {
                    message: "Not connected to robot".to_string(),
                    timestamp: Utc::now(),
                })
                .event("error");
                continue;
            }

            for transition in detector.observe(&snapshot) {
                match transition {
                    Transition::PreparationStarted => {
                        let cocktail_id = match detect_active_cocktail(&manager).await {
                            Ok(id) => id,
                            Err(err) => {
                                warn!("could not resolve active cocktail: {err}");
                                None
                            }
                        };
                        if let Some(id) = cocktail_id {
                            tracker.lock().await.adopt_order(id);
                        }
                        yield Event::json(&PreparationStartedPayload {
                            cocktail_id,
                            timestamp: Utc::now(),
                        })
                        .event("preparation_started");
                    }
                    Transition::DrinkReady => {
                        yield Event::json(&now_payload()).event("drink_ready");
                    }
                    Transition::RobotReady => {
                        yield Event::json(&now_payload()).event("robot_ready");
                    }
                }
            }

            let (action, progress) = {
                let mut tracker = tracker.lock().await;
                (tracker.observe(&snapshot), tracker.progress())
            };
            if action == TrackerAction::TriggerReset {
                info!("drink ready observed on the push channel, resetting command coils");
                reset_all_addresses(&manager).await;
            }

            yield Event::json(&StateUpdatePayload {
                robot_state: snapshot,
                progress,
                timestamp: Utc::now(),
            })
            .event("state_update");
        }
    }
}

/// Current Modbus connection configuration.
#[get("/modbus/config")]
pub async fn get_modbus_config(config: &State<SharedConfig>) -> Json<ModbusConfigResponse> {
    let modbus = config.read().await.modbus.clone();
    Json(ModbusConfigResponse {
        success: true,
        config: modbus,
        message: None,
    })
}

/// Update the Modbus connection configuration, persist it and force a
/// reconnect so the next request uses the new settings.
#[post("/modbus/config", data = "<request>")]
pub async fn update_modbus_config(
    request: Json<UpdateModbusConfigRequest>,
    config: &State<SharedConfig>,
    config_path: &State<ConfigPath>,
    manager: &State<Arc<ConnectionManager>>,
) -> Result<Json<ModbusConfigResponse>, ApiError> {
    if request.host.trim().is_empty() {
        return Err(api_error(Status::BadRequest, "Host and port are required"));
    }

    let updated: Config = {
        let mut config = config.write().await;
        config.modbus.host = request.host.clone();
        config.modbus.port = request.port;
        if let Some(unit_id) = request.unit_id {
            config.modbus.unit_id = unit_id;
        }
        if let Some(timeout) = request.timeout {
            config.modbus.timeout_ms = timeout;
        }
        config.clone()
    };

    updated.save_to_file(&config_path.0).map_err(|err| {
        api_error(
            Status::InternalServerError,
            format!("Failed to save configuration: {err}"),
        )
    })?;

    manager.force_reconnect().await;
    info!("modbus configuration updated, reconnection forced");

    Ok(Json(ModbusConfigResponse {
        success: true,
        config: updated.modbus,
        message: Some(
            "Configuration updated successfully. Next connection will use new settings."
                .to_string(),
        ),
    }))
}

/// Liveness endpoint: always 200, the app is healthy even with the robot
/// offline. Clears the reconnect counter so other endpoints may retry.
#[get("/health")]
pub async fn health(manager: &State<Arc<ConnectionManager>>) -> Json<HealthResponse> {
    let connected = manager.is_connected().await;
    if !connected {
        manager.reset_attempts().await;
    }

    Json(HealthResponse {
        status: "healthy".to_string(),
        app: "running".to_string(),
        modbus: HealthModbus {
            connected,
            message: if connected {
                "Connected".to_string()
            } else {
                "Disconnected (app still operational)".to_string()
            },
        },
        timestamp: Utc::now(),
    })
}
