use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        GameEntity, GameEventEntity, GameRecord, GuessEntity, PlayerEntity, PlayerScoreEntity,
        RoundResultEntity, RoundScoreEntity, ScoredGuessEntity, SpectrumPairEntity,
    },
    dto::{
        format_system_time,
        validation::{validate_room_code, validate_username},
    },
    state::state_machine::GamePhase,
};

/// Payload used to open a new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(custom(function = validate_room_code))]
    pub room_code: String,
    #[validate(length(min = 1, max = 64))]
    pub host_id: String,
    #[validate(custom(function = validate_username))]
    pub host_username: String,
    /// Must be a positive integer.
    pub total_rounds: i64,
}

/// Payload used to enter a room by its code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    #[validate(custom(function = validate_room_code))]
    pub room_code: String,
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(custom(function = validate_username))]
    pub username: String,
}

/// Host-only action.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct HostActionRequest {
    #[validate(length(min = 1, max = 64))]
    pub host_id: String,
}

/// Action performed by a player of the game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerActionRequest {
    #[validate(length(min = 1, max = 64))]
    pub player_id: String,
}

/// A player's position on the dial.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitGuessRequest {
    #[validate(length(min = 1, max = 64))]
    pub player_id: String,
    /// Dial value between 1 and 24.
    pub guess: i32,
}

/// Presence heartbeat.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerStatusRequest {
    #[validate(length(min = 1, max = 64))]
    pub player_id: String,
    pub is_online: bool,
}

/// Query accepted by the event log route.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Maximum number of entries, newest first (default 10).
    pub limit: Option<usize>,
}

/// Labels of the two ends of the dial.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpectrumPairSummary {
    pub left: String,
    pub right: String,
}

/// Public projection of a game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSummary {
    pub id: Uuid,
    pub room_code: String,
    pub host_id: String,
    pub total_rounds: u32,
    pub current_round: u32,
    pub phase: GamePhase,
    pub target: Option<i32>,
    pub current_describer_id: Option<String>,
    pub spectrum: Option<SpectrumPairSummary>,
    pub describers_this_round: Vec<String>,
    pub players_ready_for_next_round: Vec<String>,
    pub round_started_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub user_id: String,
    pub username: String,
    pub is_online: bool,
    pub is_describer: bool,
    pub joined_at: String,
}

/// Game with its roster in join order.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameWithPlayersResponse {
    pub game: GameSummary,
    pub players: Vec<PlayerSummary>,
}

/// Result of entering a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGameResponse {
    pub game_id: Uuid,
    /// The player already belonged to the game and was brought back online.
    pub rejoined: bool,
    pub game: GameSummary,
    pub players: Vec<PlayerSummary>,
}

/// A guess of the current round.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessSummary {
    pub player_id: String,
    pub round: u32,
    pub guess: i32,
    pub submitted_at: String,
}

/// A current-round guess together with the guesser's display name.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessWithPlayer {
    pub player_id: String,
    pub username: Option<String>,
    pub round: u32,
    pub guess: i32,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoredGuessSummary {
    pub player_id: String,
    pub guess: i32,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResultSummary {
    pub round: u32,
    pub target: i32,
    pub guesses: Vec<ScoredGuessSummary>,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundScoreSummary {
    pub round: u32,
    /// Points earned that round, describer bonus included.
    pub score: u32,
    pub is_describer: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerScoreSummary {
    pub player_id: String,
    pub total_score: u32,
    pub round_scores: Vec<RoundScoreSummary>,
    pub updated_at: String,
}

/// Combined view used by the scoreboard and pushed over SSE.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStatsResponse {
    /// Stored record version; a snapshot with a lower version is stale.
    pub version: u64,
    pub game: GameSummary,
    pub players: Vec<PlayerSummary>,
    pub round_results: Vec<RoundResultSummary>,
    /// Total score keyed by player id, in join order.
    #[schema(value_type = Object)]
    pub scores: IndexMap<String, u32>,
    pub total_rounds: u32,
    pub current_round: u32,
    pub phase: GamePhase,
    /// Countdown clients run before forcing the reveal.
    pub guess_timeout_secs: u64,
}

/// Audit log entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameEventSummary {
    pub kind: String,
    pub player_id: String,
    #[schema(value_type = Object)]
    pub data: Value,
    pub timestamp: String,
}

/// Summary of the game after a mutation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub game_id: Uuid,
    pub phase: GamePhase,
    pub current_round: u32,
    pub current_describer_id: Option<String>,
}

/// Response to a guess submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessResponse {
    #[serde(flatten)]
    pub action: ActionResponse,
    /// Every guesser has answered; the round was revealed.
    pub all_submitted: bool,
}

/// Response to a ready acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    #[serde(flatten)]
    pub action: ActionResponse,
    pub ready_players: usize,
    pub total_players: usize,
}

/// Response to the forced advance.
#[derive(Debug, Serialize, ToSchema)]
pub struct AutoSubmitResponse {
    #[serde(flatten)]
    pub action: ActionResponse,
    /// Number of midpoint guesses filled in.
    pub default_guesses: usize,
}

impl From<&SpectrumPairEntity> for SpectrumPairSummary {
    fn from(pair: &SpectrumPairEntity) -> Self {
        Self {
            left: pair.left.clone(),
            right: pair.right.clone(),
        }
    }
}

impl From<&GameEntity> for GameSummary {
    fn from(game: &GameEntity) -> Self {
        let turn = game.turn.as_ref();
        Self {
            id: game.id,
            room_code: game.room_code.clone(),
            host_id: game.host_id.clone(),
            total_rounds: game.total_rounds,
            current_round: game.current_round,
            phase: game.phase,
            target: turn.map(|turn| turn.target),
            current_describer_id: turn.map(|turn| turn.describer_id.clone()),
            spectrum: turn
                .and_then(|turn| turn.spectrum_pair.as_ref())
                .map(Into::into),
            describers_this_round: game.describers_this_round.clone(),
            players_ready_for_next_round: game.players_ready_for_next_round.clone(),
            round_started_at: game.round_started_at.map(format_system_time),
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
        }
    }
}

impl From<&PlayerEntity> for PlayerSummary {
    fn from(player: &PlayerEntity) -> Self {
        Self {
            user_id: player.user_id.clone(),
            username: player.username.clone(),
            is_online: player.is_online,
            is_describer: player.is_describer,
            joined_at: format_system_time(player.joined_at),
        }
    }
}

impl From<&GuessEntity> for GuessSummary {
    fn from(guess: &GuessEntity) -> Self {
        Self {
            player_id: guess.player_id.clone(),
            round: guess.round,
            guess: guess.value,
            submitted_at: format_system_time(guess.submitted_at),
        }
    }
}

impl GuessWithPlayer {
    /// Attach the guesser's display name to a guess.
    pub fn new(guess: &GuessEntity, username: Option<String>) -> Self {
        Self {
            player_id: guess.player_id.clone(),
            username,
            round: guess.round,
            guess: guess.value,
            submitted_at: format_system_time(guess.submitted_at),
        }
    }
}

impl From<&ScoredGuessEntity> for ScoredGuessSummary {
    fn from(guess: &ScoredGuessEntity) -> Self {
        Self {
            player_id: guess.player_id.clone(),
            guess: guess.guess,
            score: guess.score,
        }
    }
}

impl From<&RoundResultEntity> for RoundResultSummary {
    fn from(result: &RoundResultEntity) -> Self {
        Self {
            round: result.round,
            target: result.target,
            guesses: result.guesses.iter().map(Into::into).collect(),
            created_at: format_system_time(result.created_at),
        }
    }
}

impl From<&RoundScoreEntity> for RoundScoreSummary {
    fn from(entry: &RoundScoreEntity) -> Self {
        Self {
            round: entry.round,
            score: entry.score,
            is_describer: entry.is_describer,
        }
    }
}

impl From<&PlayerScoreEntity> for PlayerScoreSummary {
    fn from(score: &PlayerScoreEntity) -> Self {
        Self {
            player_id: score.player_id.clone(),
            total_score: score.total_score,
            round_scores: score.round_scores.iter().map(Into::into).collect(),
            updated_at: format_system_time(score.updated_at),
        }
    }
}

impl From<&GameEventEntity> for GameEventSummary {
    fn from(event: &GameEventEntity) -> Self {
        Self {
            kind: event.kind.as_str().to_owned(),
            player_id: event.player_id.clone(),
            data: event.data.clone(),
            timestamp: format_system_time(event.timestamp),
        }
    }
}

impl From<&GameRecord> for GameWithPlayersResponse {
    fn from(record: &GameRecord) -> Self {
        Self {
            game: (&record.game).into(),
            players: record.players.iter().map(Into::into).collect(),
        }
    }
}

impl From<&GameRecord> for ActionResponse {
    fn from(record: &GameRecord) -> Self {
        Self {
            game_id: record.game.id,
            phase: record.game.phase,
            current_round: record.game.current_round,
            current_describer_id: record.describer_id().map(str::to_owned),
        }
    }
}

impl GameStatsResponse {
    /// Build the combined view of a game.
    pub fn from_record(record: &GameRecord, guess_timeout_secs: u64) -> Self {
        // Every player appears, with zero until their first finalized round.
        let scores = record
            .players
            .iter()
            .map(|player| {
                let total = record
                    .player_scores
                    .iter()
                    .find(|score| score.player_id == player.user_id)
                    .map_or(0, |score| score.total_score);
                (player.user_id.clone(), total)
            })
            .collect();

        Self {
            version: record.version,
            game: (&record.game).into(),
            players: record.players.iter().map(Into::into).collect(),
            round_results: record.round_results.iter().map(Into::into).collect(),
            scores,
            total_rounds: record.game.total_rounds,
            current_round: record.game.current_round,
            phase: record.game.phase,
            guess_timeout_secs,
        }
    }
}
