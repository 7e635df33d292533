use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use wavelength_back::{
    build_router,
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    state::{AppState, SharedState},
};

async fn connected_state() -> SharedState {
    let state = AppState::new(AppConfig::default());
    state
        .set_game_store(Arc::new(MemoryGameStore::new()))
        .await;
    state
}

async fn send(state: &SharedState, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn create(state: &SharedState, room_code: &str, host_id: &str, total_rounds: i64) -> String {
    let (status, created) = send(
        state,
        post_json(
            "/games",
            json!({
                "room_code": room_code,
                "host_id": host_id,
                "host_username": host_id.to_uppercase(),
                "total_rounds": total_rounds
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    created["game"]["id"].as_str().unwrap().to_owned()
}

async fn join(state: &SharedState, room_code: &str, user_id: &str) -> (StatusCode, Value) {
    send(
        state,
        post_json(
            "/games/join",
            json!({
                "room_code": room_code,
                "user_id": user_id,
                "username": user_id.to_uppercase()
            }),
        ),
    )
    .await
}

/// Host plus `ana` and `bo`, still waiting.
async fn open_room(state: &SharedState, room_code: &str, total_rounds: i64) -> String {
    let game_id = create(state, room_code, "host", total_rounds).await;
    for user_id in ["ana", "bo"] {
        let (status, _) = join(state, &room_code.to_lowercase(), user_id).await;
        assert_eq!(status, StatusCode::OK);
    }
    game_id
}

async fn start(state: &SharedState, game_id: &str, host_id: &str) -> (StatusCode, Value) {
    send(
        state,
        post_json(
            &format!("/games/{game_id}/start"),
            json!({ "host_id": host_id }),
        ),
    )
    .await
}

async fn guess(state: &SharedState, game_id: &str, player_id: &str, value: i32) -> (StatusCode, Value) {
    send(
        state,
        post_json(
            &format!("/games/{game_id}/guesses"),
            json!({ "player_id": player_id, "guess": value }),
        ),
    )
    .await
}

#[tokio::test]
async fn single_round_game_plays_to_the_end() {
    let state = connected_state().await;
    let game_id = open_room(&state, "ROUND1", 1).await;

    let (status, started) = start(&state, &game_id, "host").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["phase"], "playing");
    assert_eq!(started["current_round"], 1);
    assert_eq!(started["current_describer_id"], "host");

    let (status, first) = guess(&state, &game_id, "ana", 12).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["all_submitted"], false);
    let (_, last) = guess(&state, &game_id, "bo", 13).await;
    assert_eq!(last["all_submitted"], true);
    assert_eq!(last["phase"], "scoring");

    let (_, stats) = send(&state, get(&format!("/games/{game_id}/stats"))).await;
    assert_eq!(stats["phase"], "scoring");
    assert!(stats["version"].as_u64().unwrap() > 0);
    let (_, guesses) = send(&state, get(&format!("/games/{game_id}/guesses/current"))).await;
    assert_eq!(guesses.as_array().unwrap().len(), 2);

    let (status, closed) = send(
        &state,
        post_json(
            &format!("/games/{game_id}/round/continue"),
            json!({ "player_id": "host" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["phase"], "finished");
    assert!(closed["current_describer_id"].is_null());

    let (_, results) = send(&state, get(&format!("/games/{game_id}/results"))).await;
    assert_eq!(results.as_array().unwrap().len(), 1);
    assert_eq!(results[0]["guesses"].as_array().unwrap().len(), 2);

    let (_, scores) = send(&state, get(&format!("/games/{game_id}/scores"))).await;
    assert_eq!(scores.as_array().unwrap().len(), 3);

    let (_, events) = send(&state, get(&format!("/games/{game_id}/events"))).await;
    assert_eq!(events[0]["kind"], "round_ended");
}

#[tokio::test]
async fn finished_game_refuses_new_players() {
    let state = connected_state().await;
    let game_id = create(&state, "DUO001", "h", 1).await;
    let (status, _) = join(&state, "DUO001", "g").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = start(&state, &game_id, "h").await;
    assert_eq!(status, StatusCode::OK);

    let (_, revealed) = guess(&state, &game_id, "g", 12).await;
    assert_eq!(revealed["all_submitted"], true);
    let (_, closed) = send(
        &state,
        post_json(
            &format!("/games/{game_id}/round/continue"),
            json!({ "player_id": "h" }),
        ),
    )
    .await;
    assert_eq!(closed["phase"], "finished");

    let (status, result) = send(&state, get(&format!("/games/{game_id}/results/1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["guesses"][0]["player_id"], "g");
    assert_eq!(result["guesses"][0]["guess"], 12);

    let (status, body) = join(&state, "DUO001", "late").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn describer_cannot_guess() {
    let state = connected_state().await;
    let game_id = open_room(&state, "NOPEEK", 2).await;
    start(&state, &game_id, "host").await;

    let (status, _) = guess(&state, &game_id, "host", 5).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn out_of_range_guess_is_rejected() {
    let state = connected_state().await;
    let game_id = open_room(&state, "RANGE1", 2).await;
    start(&state, &game_id, "host").await;

    let (status, _) = guess(&state, &game_id, "ana", 25).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_host_starts_the_game() {
    let state = connected_state().await;
    let game_id = open_room(&state, "HOSTED", 2).await;

    let (status, _) = start(&state, &game_id, "ana").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_operations_while_degraded() {
    let state = AppState::new(AppConfig::default());

    let (status, body) = send(&state, get(&format!("/games/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn create_then_fetch_by_room_code() {
    let state = connected_state().await;
    let game_id = create(&state, "HTTP01", "host", 3).await;

    let (status, found) = send(&state, get("/games/by-room/http01")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], game_id.as_str());
    assert_eq!(found["phase"], "waiting");
}

#[tokio::test]
async fn rejects_malformed_room_codes() {
    let state = connected_state().await;

    let (status, _) = send(
        &state,
        post_json(
            "/games",
            json!({
                "room_code": "AB",
                "host_id": "host",
                "host_username": "Host",
                "total_rounds": 3
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_game_is_not_found() {
    let state = connected_state().await;

    let (status, body) = send(&state, get(&format!("/games/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn healthcheck_reports_degraded_without_storage() {
    let state = AppState::new(AppConfig::default());

    let (status, body) = send(&state, get("/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}
