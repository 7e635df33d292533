use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{
        ActionResponse, AutoSubmitResponse, CreateGameRequest, GameWithPlayersResponse,
        GuessResponse, HostActionRequest, JoinGameRequest, JoinGameResponse,
        PlayerActionRequest, PlayerStatusRequest, ReadyResponse, SubmitGuessRequest,
    },
    error::AppError,
    services::lifecycle_service,
    state::SharedState,
};

/// Routes driving the round lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/join", post(join_game))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/guesses", post(submit_guess))
        .route("/games/{id}/auto-submit", post(auto_submit_guesses))
        .route("/games/{id}/describer/switch", post(switch_describer))
        .route("/games/{id}/round/end", post(end_round))
        .route("/games/{id}/round/continue", post(continue_to_next_round))
        .route("/games/{id}/round/ready", post(mark_ready))
        .route("/games/{id}/players/status", post(update_player_status))
}

/// Open a new room.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameWithPlayersResponse),
        (status = 400, description = "Invalid room code, name or round count")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameWithPlayersResponse>, AppError> {
    Ok(Json(lifecycle_service::create_game(&state, payload).await?))
}

/// Join a room by its code, or come back to it.
#[utoipa::path(
    post,
    path = "/games/join",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined", body = JoinGameResponse),
        (status = 404, description = "Unknown room code"),
        (status = 409, description = "Game already finished")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<JoinGameResponse>, AppError> {
    Ok(Json(lifecycle_service::join_game(&state, payload).await?))
}

/// Host starts the current round.
#[utoipa::path(
    post,
    path = "/games/{id}/start",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = HostActionRequest,
    responses(
        (status = 200, description = "Round started", body = ActionResponse),
        (status = 401, description = "Caller is not the host"),
        (status = 409, description = "Game is not waiting")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<HostActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        lifecycle_service::start_game(&state, id, &payload.host_id).await?,
    ))
}

/// Submit or overwrite a guess for the current round.
#[utoipa::path(
    post,
    path = "/games/{id}/guesses",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = SubmitGuessRequest,
    responses(
        (status = 200, description = "Guess recorded", body = GuessResponse),
        (status = 400, description = "Guess outside 1..=24"),
        (status = 403, description = "Describers cannot guess"),
        (status = 404, description = "Unknown game or player"),
        (status = 409, description = "Game is not collecting guesses")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitGuessRequest>>,
) -> Result<Json<GuessResponse>, AppError> {
    Ok(Json(
        lifecycle_service::submit_guess(&state, id, payload).await?,
    ))
}

/// Timer expiry: fill missing guesses with the midpoint and reveal.
#[utoipa::path(
    post,
    path = "/games/{id}/auto-submit",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Forced advance applied or skipped", body = AutoSubmitResponse))
)]
pub async fn auto_submit_guesses(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AutoSubmitResponse>, AppError> {
    Ok(Json(
        lifecycle_service::auto_submit_guesses(&state, id).await?,
    ))
}

/// Current describer hands over to the next player.
#[utoipa::path(
    post,
    path = "/games/{id}/describer/switch",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Describer switched or round closed", body = ActionResponse),
        (status = 403, description = "Caller is not the describer")
    )
)]
pub async fn switch_describer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        lifecycle_service::switch_describer(&state, id, &payload.player_id).await?,
    ))
}

/// Describer closes the round while guesses are still open.
#[utoipa::path(
    post,
    path = "/games/{id}/round/end",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Round closed", body = ActionResponse),
        (status = 403, description = "Caller is not the describer")
    )
)]
pub async fn end_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        lifecycle_service::end_round(&state, id, &payload.player_id).await?,
    ))
}

/// Describer moves on from the reveal.
#[utoipa::path(
    post,
    path = "/games/{id}/round/continue",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Round closed", body = ActionResponse),
        (status = 403, description = "Caller is not the describer"),
        (status = 409, description = "Game is not in scoring")
    )
)]
pub async fn continue_to_next_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        lifecycle_service::continue_to_next_round(&state, id, &payload.player_id).await?,
    ))
}

/// Player acknowledges the reveal.
#[utoipa::path(
    post,
    path = "/games/{id}/round/ready",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Readiness recorded", body = ReadyResponse),
        (status = 404, description = "Unknown player"),
        (status = 409, description = "Game is not in scoring")
    )
)]
pub async fn mark_ready(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ReadyResponse>, AppError> {
    Ok(Json(
        lifecycle_service::mark_ready_for_next_round(&state, id, &payload.player_id).await?,
    ))
}

/// Presence heartbeat.
#[utoipa::path(
    post,
    path = "/games/{id}/players/status",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = PlayerStatusRequest,
    responses(
        (status = 200, description = "Presence updated", body = ActionResponse),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn update_player_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PlayerStatusRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        lifecycle_service::update_player_status(&state, id, payload).await?,
    ))
}
