use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::GameRecord,
    dto::{
        game::GameStatsResponse,
        sse::{ServerEvent, SystemStatus},
    },
    state::SharedState,
};

/// SSE event name carrying a game snapshot.
pub const EVENT_GAME_UPDATED: &str = "game.updated";
/// SSE event name carrying the degraded flag.
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the committed snapshot of a game to its subscribers.
pub fn broadcast_game_updated(state: &SharedState, record: &GameRecord) {
    let payload = game_snapshot(state, record);
    send_event(state, Some(record.game.id), EVENT_GAME_UPDATED, &payload);
}

/// Broadcast a degraded mode change to every stream.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(state, None, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Stats view pushed over SSE and served by the stats route.
pub fn game_snapshot(state: &SharedState, record: &GameRecord) -> GameStatsResponse {
    GameStatsResponse::from_record(record, state.config().guess_timeout().as_secs())
}

fn send_event(state: &SharedState, game_id: Option<Uuid>, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(game_id, Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
