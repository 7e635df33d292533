use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::game::{
        ActionResponse, AutoSubmitResponse, CreateGameRequest, GameWithPlayersResponse,
        GuessResponse, JoinGameRequest, JoinGameResponse, PlayerStatusRequest, ReadyResponse,
        SubmitGuessRequest,
    },
    error::ServiceError,
    state::{
        SharedState,
        lifecycle::{
            AutoSubmitOutcome, JoinOutcome, ReadyOutcome, TurnOutcome, new_game,
            normalize_room_code,
        },
        transitions::run_operation_with_broadcast,
    },
};

/// Open a new room with the host as its only player.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameWithPlayersResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let record = new_game(
        Uuid::new_v4(),
        &request.room_code,
        &request.host_id,
        &request.host_username,
        request.total_rounds,
        SystemTime::now(),
    )?;

    store.insert_game(record.clone()).await?;
    info!(
        game_id = %record.game.id,
        room_code = %record.game.room_code,
        host_id = %record.game.host_id,
        total_rounds = record.game.total_rounds,
        "game created"
    );

    Ok((&record).into())
}

/// Enter the room identified by `room_code`, or come back to it.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<JoinGameResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let room_code = normalize_room_code(&request.room_code);
    let game_id = store
        .find_game_by_room_code(room_code.clone())
        .await?
        .map(|record| record.game.id)
        .ok_or_else(|| ServiceError::NotFound(format!("no game with room code `{room_code}`")))?;

    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.join(&request.user_id, &request.username, dealer.now())
    })
    .await?;

    let rejoined = update.value == JoinOutcome::Rejoined;
    info!(%game_id, player_id = %request.user_id, rejoined, "player joined");

    Ok(JoinGameResponse {
        game_id,
        rejoined,
        game: (&update.record.game).into(),
        players: update.record.players.iter().map(Into::into).collect(),
    })
}

/// Host starts the current round.
pub async fn start_game(
    state: &SharedState,
    game_id: Uuid,
    host_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.start_game(host_id, dealer)
    })
    .await?;

    info!(
        %game_id,
        round = update.record.game.current_round,
        "round started"
    );
    Ok((&update.record).into())
}

/// Record a guess for the current round.
pub async fn submit_guess(
    state: &SharedState,
    game_id: Uuid,
    request: SubmitGuessRequest,
) -> Result<GuessResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.submit_guess(&request.player_id, request.guess, dealer.now())
    })
    .await?;

    debug!(
        %game_id,
        player_id = %request.player_id,
        round = update.record.game.current_round,
        all_submitted = update.value.all_submitted,
        "guess recorded"
    );
    Ok(GuessResponse {
        action: (&update.record).into(),
        all_submitted: update.value.all_submitted,
    })
}

/// Timer expiry: fill missing guesses with the midpoint and reveal.
pub async fn auto_submit_guesses(
    state: &SharedState,
    game_id: Uuid,
) -> Result<AutoSubmitResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.auto_submit_guesses(dealer.now())
    })
    .await?;

    let default_guesses = match update.value {
        AutoSubmitOutcome::Skipped => {
            debug!(%game_id, "auto-submit skipped; game is not collecting guesses");
            0
        }
        AutoSubmitOutcome::Revealed { defaults } => {
            info!(%game_id, defaults, "guess timer expired");
            defaults
        }
    };

    Ok(AutoSubmitResponse {
        action: (&update.record).into(),
        default_guesses,
    })
}

/// Current describer hands the dial to the next player.
pub async fn switch_describer(
    state: &SharedState,
    game_id: Uuid,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.switch_describer(player_id, dealer)
    })
    .await?;

    log_turn_outcome(game_id, player_id, &update.value);
    Ok((&update.record).into())
}

/// Describer closes the round early.
pub async fn end_round(
    state: &SharedState,
    game_id: Uuid,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.end_round(player_id, dealer)
    })
    .await?;

    info!(
        %game_id,
        %player_id,
        round = update.value.round,
        finished = update.value.finished,
        "round ended by describer"
    );
    Ok((&update.record).into())
}

/// Describer moves on from the reveal.
pub async fn continue_to_next_round(
    state: &SharedState,
    game_id: Uuid,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.continue_to_next_round(player_id, dealer)
    })
    .await?;

    info!(
        %game_id,
        %player_id,
        round = update.value.round,
        finished = update.value.finished,
        "round closed"
    );
    Ok((&update.record).into())
}

/// Player acknowledges the reveal.
pub async fn mark_ready_for_next_round(
    state: &SharedState,
    game_id: Uuid,
    player_id: &str,
) -> Result<ReadyResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, dealer| {
        record.mark_ready_for_next_round(player_id, dealer)
    })
    .await?;

    let total_players = update.record.players.len();
    let ready_players = match &update.value {
        ReadyOutcome::Pending { ready, .. } => {
            debug!(%game_id, %player_id, ready, total_players, "player ready");
            *ready
        }
        ReadyOutcome::Advanced(outcome) => {
            log_turn_outcome(game_id, player_id, outcome);
            total_players
        }
    };

    Ok(ReadyResponse {
        action: (&update.record).into(),
        ready_players,
        total_players,
    })
}

/// Presence heartbeat.
pub async fn update_player_status(
    state: &SharedState,
    game_id: Uuid,
    request: PlayerStatusRequest,
) -> Result<ActionResponse, ServiceError> {
    let update = run_operation_with_broadcast(state, game_id, |record, _| {
        record.set_player_online(&request.player_id, request.is_online)
    })
    .await?;

    debug!(
        %game_id,
        player_id = %request.player_id,
        is_online = request.is_online,
        "player presence updated"
    );
    Ok((&update.record).into())
}

fn log_turn_outcome(game_id: Uuid, player_id: &str, outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Rotated { describer_id } => {
            info!(%game_id, from = %player_id, to = %describer_id, "describer rotated");
        }
        TurnOutcome::Closed(closed) => {
            info!(
                %game_id,
                round = closed.round,
                finished = closed.finished,
                "every player described; round closed"
            );
        }
    }
}
