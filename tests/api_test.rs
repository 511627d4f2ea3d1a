//! End-to-end API tests: Rocket local client in front of the robot simulator.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use rocket::figment::Figment;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use rocket::tokio::io::AsyncReadExt;
use serde_json::Value;
use tempfile::TempDir;

use rust_barbot::registers::{
    COCKTAIL_TRIGGER_START, DRINK_READY_ADDRESS, START_SIGNAL_ADDRESS, WAITING_RECIPE_ADDRESS,
};
use rust_barbot::server::build_rocket;

/// A Rocket client wired to a connection manager targeting `addr`.
///
/// The TempDir must be kept alive for configuration persistence tests.
async fn client_for(addr: SocketAddr) -> (Client, TempDir) {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("barbot.yaml");
    let config = common::shared_config_for(addr);

    let rocket = build_rocket(Figment::from(rocket::Config::default()), config, config_path).await;
    let client = Client::tracked(rocket).await.unwrap();
    (client, dir)
}

async fn body_json(response: LocalResponse<'_>) -> Value {
    let body = response.into_string().await.unwrap();
    serde_json::from_str(&body).unwrap()
}

/// Read the SSE stream into `seen` until `needle` shows up.
async fn read_stream_until(response: &mut LocalResponse<'_>, seen: &mut String, needle: &str) {
    let deadline = rocket::tokio::time::Instant::now() + Duration::from_secs(15);
    while !seen.contains(needle) {
        let mut chunk = [0u8; 512];
        let n = rocket::tokio::time::timeout_at(deadline, response.read(&mut chunk))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; saw: {seen}"))
            .expect("event stream read failed");
        assert!(n > 0, "event stream closed before {needle:?}");
        seen.push_str(&String::from_utf8_lossy(&chunk[..n]));
    }
}

#[tokio::test]
async fn health_is_ok_even_without_a_robot() {
    let (client, _dir) = client_for(common::dead_addr().await).await;

    let response = client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["modbus"]["connected"], false);
}

#[tokio::test]
async fn ordering_a_mojito_over_http() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    let response = client.post("/api/cocktails/mojito").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["cocktailId"], "mojito");
    assert_eq!(body["ingredientsWritten"], 9);

    let writes = sim.writes();
    assert_eq!(writes.last(), Some(&(START_SIGNAL_ADDRESS, true)));
    assert_eq!(sim.coil(COCKTAIL_TRIGGER_START), Some(true));

    server.abort();
}

#[tokio::test]
async fn unknown_cocktail_is_a_404() {
    let (addr, _sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    let response = client.post("/api/cocktails/appletini").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);

    server.abort();
}

#[tokio::test]
async fn busy_robot_answers_503_and_writes_nothing() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    sim.set_coil(WAITING_RECIPE_ADDRESS, false);

    let response = client.post("/api/cocktails/mojito").dispatch().await;
    assert_eq!(response.status(), Status::ServiceUnavailable);
    assert!(sim.writes().is_empty());

    server.abort();
}

#[tokio::test]
async fn custom_order_over_http() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    let response = client
        .post("/api/cocktails/custom")
        .header(ContentType::JSON)
        .body(r#"{"ingredients":["ice","whiskey"]}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = body_json(response).await;
    assert_eq!(body["cocktailId"], "custom");
    assert_eq!(body["ingredientsWritten"], 2);
    assert_eq!(sim.writes().last(), Some(&(START_SIGNAL_ADDRESS, true)));

    server.abort();
}

#[tokio::test]
async fn empty_custom_selection_is_a_400() {
    let (addr, _sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    let response = client
        .post("/api/cocktails/custom")
        .header(ContentType::JSON)
        .body(r#"{"ingredients":[]}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    server.abort();
}

#[tokio::test]
async fn status_tracks_an_order_to_completion_and_resets_once() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    let response = client.post("/api/cocktails/whiskey-rocks").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/api/status").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["isConnected"], true);
    assert_eq!(body["activeCocktailId"], "whiskey-rocks");
    assert_eq!(body["progress"], 0);

    // The robot finishes the drink.
    sim.set_coil(WAITING_RECIPE_ADDRESS, false);
    sim.set_coil(DRINK_READY_ADDRESS, true);
    sim.clear_writes();

    // This poll observes drinkReady and runs the reset inline.
    let response = client.get("/api/status").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["progress"], 100);
    assert_eq!(body["robotState"]["drinkReady"], true);

    let writes = sim.writes();
    assert!(writes.contains(&(START_SIGNAL_ADDRESS, false)));
    assert_eq!(sim.coil(COCKTAIL_TRIGGER_START + 3), Some(false));
    sim.clear_writes();

    // The robot reports ready again: tracking stops and no second reset runs.
    sim.set_coil(DRINK_READY_ADDRESS, false);
    sim.set_coil(WAITING_RECIPE_ADDRESS, true);

    let response = client.get("/api/status").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["progress"], 0);
    assert!(body.get("activeCocktailId").is_none());
    assert!(sim.writes().is_empty());

    server.abort();
}

#[tokio::test]
async fn events_stream_emits_transitions_and_runs_the_reset_once() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    // Place an order so the shared tracker is preparing.
    let response = client.post("/api/cocktails/neat-whiskey").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    sim.clear_writes();

    let mut stream = client.get("/api/events").dispatch().await;
    assert_eq!(stream.status(), Status::Ok);

    // Handshake, then the first tick's snapshot seeds the baseline.
    let mut seen = String::new();
    read_stream_until(&mut stream, &mut seen, "event:connected").await;
    read_stream_until(&mut stream, &mut seen, "event:state_update").await;

    // The robot finishes the drink between ticks.
    sim.set_coil(WAITING_RECIPE_ADDRESS, false);
    sim.set_coil(DRINK_READY_ADDRESS, true);

    read_stream_until(&mut stream, &mut seen, "event:preparation_started").await;
    read_stream_until(&mut stream, &mut seen, "event:drink_ready").await;

    // The tick that saw drinkReady runs the reset before its state_update.
    let updates_before = seen.matches("event:state_update").count();
    read_stream_until(&mut stream, &mut seen, "\"progress\":100").await;
    assert!(seen.matches("event:state_update").count() > updates_before);

    let writes = sim.writes();
    assert!(writes.contains(&(START_SIGNAL_ADDRESS, false)));
    sim.clear_writes();

    // One more tick with the robot still resetting: no second reset runs.
    let updates_before = seen.matches("event:state_update").count();
    let deadline = rocket::tokio::time::Instant::now() + Duration::from_secs(15);
    while seen.matches("event:state_update").count() == updates_before {
        let mut chunk = [0u8; 512];
        let n = rocket::tokio::time::timeout_at(deadline, stream.read(&mut chunk))
            .await
            .expect("timed out waiting for the next state update")
            .expect("event stream read failed");
        assert!(n > 0, "event stream closed early");
        seen.push_str(&String::from_utf8_lossy(&chunk[..n]));
    }
    assert!(sim.writes().is_empty(), "reset must fire exactly once");

    drop(stream);
    server.abort();
}

#[tokio::test]
async fn initial_state_on_a_ready_robot_clears_the_start_signal() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    sim.set_coil(START_SIGNAL_ADDRESS, true); // stale from a previous run

    let response = client.get("/api/initial-state").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body = body_json(response).await;
    assert_eq!(body["robotReady"], true);
    assert_eq!(sim.coil(START_SIGNAL_ADDRESS), Some(false));

    server.abort();
}

#[tokio::test]
async fn initial_state_reports_a_preparation_in_flight() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    // A cuba libre was triggered before this server instance started.
    sim.set_coil(WAITING_RECIPE_ADDRESS, false);
    sim.set_coil(COCKTAIL_TRIGGER_START + 1, true);

    let response = client.get("/api/initial-state").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["robotReady"], false);
    assert_eq!(body["activeCocktailId"], "cuba-libre");

    // The adopted order shows up on the polling channel too.
    let response = client.get("/api/status").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["activeCocktailId"], "cuba-libre");

    server.abort();
}

#[tokio::test]
async fn reset_endpoint_clears_the_command_coils() {
    let (addr, sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    sim.set_coil(COCKTAIL_TRIGGER_START, true);
    sim.set_coil(START_SIGNAL_ADDRESS, true);

    let response = client.post("/api/reset-addresses").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(sim.coil(COCKTAIL_TRIGGER_START), Some(false));
    assert_eq!(sim.coil(START_SIGNAL_ADDRESS), Some(false));

    server.abort();
}

#[tokio::test]
async fn reset_endpoint_fails_when_nothing_can_be_written() {
    let (client, _dir) = client_for(common::dead_addr().await).await;

    let response = client.post("/api/reset-addresses").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
}

#[tokio::test]
async fn modbus_config_can_be_read_updated_and_persisted() {
    let (addr, _sim, server) = common::spawn_simulator().await;
    let (client, dir) = client_for(addr).await;

    let response = client.get("/api/modbus/config").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["config"]["port"], addr.port());

    let response = client
        .post("/api/modbus/config")
        .header(ContentType::JSON)
        .body(r#"{"host":"10.9.8.7","port":1502,"unitId":3,"timeout":250}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["config"]["host"], "10.9.8.7");
    assert_eq!(body["config"]["unitId"], 3);

    let persisted = std::fs::read_to_string(dir.path().join("barbot.yaml")).unwrap();
    assert!(persisted.contains("10.9.8.7"));

    let response = client.get("/api/modbus/config").dispatch().await;
    let body = body_json(response).await;
    assert_eq!(body["config"]["port"], 1502);

    server.abort();
}

#[tokio::test]
async fn modbus_config_update_rejects_an_empty_host() {
    let (addr, _sim, server) = common::spawn_simulator().await;
    let (client, _dir) = client_for(addr).await;

    let response = client
        .post("/api/modbus/config")
        .header(ContentType::JSON)
        .body(r#"{"host":"  ","port":502}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    server.abort();
}

#[tokio::test]
async fn cors_headers_are_present_on_every_response() {
    let (client, _dir) = client_for(common::dead_addr().await).await;

    let response = client.get("/api/health").dispatch().await;
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );

    let response = client.options("/api/cocktails/mojito").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Methods"),
        Some("POST, GET, OPTIONS")
    );
}
