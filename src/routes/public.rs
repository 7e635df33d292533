use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::game::{
        EventsQuery, GameEventSummary, GameStatsResponse, GameSummary, GuessSummary,
        GuessWithPlayer, PlayerScoreSummary, PlayerSummary, RoundResultSummary,
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Read-only projections of a game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}", get(get_game))
        .route("/games/by-room/{room_code}", get(get_game_by_room_code))
        .route("/games/{id}/players", get(get_players))
        .route("/games/{id}/guesses/current", get(get_current_guesses))
        .route(
            "/games/{id}/guesses/current/{player_id}",
            get(get_player_current_guess),
        )
        .route("/games/{id}/results", get(get_round_results))
        .route("/games/{id}/results/{round}", get(get_round_result))
        .route("/games/{id}/scores", get(get_scores))
        .route("/games/{id}/stats", get(get_game_stats))
        .route("/games/{id}/events", get(get_recent_events))
}

#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game", body = GameSummary),
        (status = 404, description = "Unknown game")
    )
)]
/// Return a game by its identifier.
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(public_service::get_game(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/games/by-room/{room_code}",
    tag = "public",
    params(("room_code" = String, Path, description = "Room code, any case")),
    responses(
        (status = 200, description = "Most recent game with this code", body = GameSummary),
        (status = 404, description = "Unknown room code")
    )
)]
/// Return the game a room code points to.
pub async fn get_game_by_room_code(
    State(state): State<SharedState>,
    Path(room_code): Path<String>,
) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(
        public_service::get_game_by_room_code(&state, &room_code).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/games/{id}/players",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Players in join order", body = [PlayerSummary]))
)]
/// Return the roster of a game.
pub async fn get_players(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    Ok(Json(public_service::get_players(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/guesses/current",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Current round guesses", body = [GuessWithPlayer]))
)]
/// Return the guesses of the current round.
pub async fn get_current_guesses(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GuessWithPlayer>>, AppError> {
    Ok(Json(public_service::get_current_guesses(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/guesses/current/{player_id}",
    tag = "public",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = String, Path, description = "Player identifier")
    ),
    responses(
        (status = 200, description = "The player's current guess", body = GuessSummary),
        (status = 404, description = "No guess this round")
    )
)]
/// Return one player's guess for the current round.
pub async fn get_player_current_guess(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, String)>,
) -> Result<Json<GuessSummary>, AppError> {
    Ok(Json(
        public_service::get_player_current_guess(&state, id, &player_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/games/{id}/results",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Finalized rounds", body = [RoundResultSummary]))
)]
/// Return every finalized round.
pub async fn get_round_results(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RoundResultSummary>>, AppError> {
    Ok(Json(public_service::get_round_results(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/results/{round}",
    tag = "public",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("round" = u32, Path, description = "Round number, 1-based")
    ),
    responses(
        (status = 200, description = "Round result", body = RoundResultSummary),
        (status = 404, description = "Round not finalized")
    )
)]
/// Return one finalized round.
pub async fn get_round_result(
    State(state): State<SharedState>,
    Path((id, round)): Path<(Uuid, u32)>,
) -> Result<Json<RoundResultSummary>, AppError> {
    Ok(Json(
        public_service::get_round_result(&state, id, round).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/games/{id}/scores",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Cumulative scores", body = [PlayerScoreSummary]))
)]
/// Return per-player cumulative scores.
pub async fn get_scores(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlayerScoreSummary>>, AppError> {
    Ok(Json(public_service::get_scores(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/stats",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Combined game view", body = GameStatsResponse))
)]
/// Return the combined game view.
pub async fn get_game_stats(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStatsResponse>, AppError> {
    Ok(Json(public_service::get_game_stats(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/events",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier"), EventsQuery),
    responses((status = 200, description = "Event log, newest first", body = [GameEventSummary]))
)]
/// Return the most recent event log entries.
pub async fn get_recent_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<GameEventSummary>>, AppError> {
    Ok(Json(
        public_service::get_recent_events(&state, id, query.limit).await?,
    ))
}
