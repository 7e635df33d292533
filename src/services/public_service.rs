use uuid::Uuid;

use crate::{
    dto::game::{
        GameEventSummary, GameStatsResponse, GameSummary, GuessSummary, GuessWithPlayer,
        PlayerScoreSummary, PlayerSummary, RoundResultSummary,
    },
    error::ServiceError,
    services::sse_events::game_snapshot,
    state::{SharedState, lifecycle::normalize_room_code},
};

/// Entries returned by the event log when no limit is given.
pub const DEFAULT_EVENT_LIMIT: usize = 10;

/// Return a game by its identifier.
pub async fn get_game(state: &SharedState, game_id: Uuid) -> Result<GameSummary, ServiceError> {
    let record = state.load_game(game_id).await?;
    Ok((&record.game).into())
}

/// Return the most recent game opened with `room_code`.
pub async fn get_game_by_room_code(
    state: &SharedState,
    room_code: &str,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_game_store().await?;
    let room_code = normalize_room_code(room_code);
    let record = store
        .find_game_by_room_code(room_code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no game with room code `{room_code}`")))?;
    Ok((&record.game).into())
}

/// Return the players of a game in join order.
pub async fn get_players(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<PlayerSummary>, ServiceError> {
    let record = state.load_game(game_id).await?;
    Ok(record.players.iter().map(Into::into).collect())
}

/// Return the current round's guesses with each guesser's display name.
pub async fn get_current_guesses(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<GuessWithPlayer>, ServiceError> {
    let record = state.load_game(game_id).await?;
    let guesses = record
        .current_round_guesses()
        .map(|guess| {
            let username = record
                .player(&guess.player_id)
                .map(|player| player.username.clone());
            GuessWithPlayer::new(guess, username)
        })
        .collect();
    Ok(guesses)
}

/// Return a player's guess for the current round.
pub async fn get_player_current_guess(
    state: &SharedState,
    game_id: Uuid,
    player_id: &str,
) -> Result<GuessSummary, ServiceError> {
    let record = state.load_game(game_id).await?;
    record
        .current_round_guesses()
        .find(|guess| guess.player_id == player_id)
        .map(Into::into)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "player `{player_id}` has no guess for round {}",
                record.game.current_round
            ))
        })
}

/// Return every finalized round in order.
pub async fn get_round_results(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<RoundResultSummary>, ServiceError> {
    let record = state.load_game(game_id).await?;
    Ok(record.round_results.iter().map(Into::into).collect())
}

/// Return the result of one finalized round.
pub async fn get_round_result(
    state: &SharedState,
    game_id: Uuid,
    round: u32,
) -> Result<RoundResultSummary, ServiceError> {
    let record = state.load_game(game_id).await?;
    record
        .round_results
        .iter()
        .find(|result| result.round == round)
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("round {round} has no result yet")))
}

/// Return per-player cumulative scores.
pub async fn get_scores(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<PlayerScoreSummary>, ServiceError> {
    let record = state.load_game(game_id).await?;
    Ok(record.player_scores.iter().map(Into::into).collect())
}

/// Return the combined game, players, scores and results view.
pub async fn get_game_stats(
    state: &SharedState,
    game_id: Uuid,
) -> Result<GameStatsResponse, ServiceError> {
    let record = state.load_game(game_id).await?;
    Ok(game_snapshot(state, &record))
}

/// Return up to `limit` event log entries, newest first.
pub async fn get_recent_events(
    state: &SharedState,
    game_id: Uuid,
    limit: Option<usize>,
) -> Result<Vec<GameEventSummary>, ServiceError> {
    let record = state.load_game(game_id).await?;
    let limit = limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    Ok(record.events.iter().rev().take(limit).map(Into::into).collect())
}
