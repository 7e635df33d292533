use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::state_machine::GamePhase;

/// Aggregate persisted per game: the game row and every row it scopes.
///
/// The store writes the aggregate as a single document so one operation is
/// applied atomically. `version` increases by one on every committed write
/// and backs the compare-and-update performed by the stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecord {
    /// Optimistic concurrency token.
    pub version: u64,
    /// Authoritative phase/round/target state.
    pub game: GameEntity,
    /// Players in join order.
    pub players: Vec<PlayerEntity>,
    /// Live guesses, at most one per (round, player).
    pub guesses: Vec<GuessEntity>,
    /// Append-only round snapshots.
    pub round_results: Vec<RoundResultEntity>,
    /// Per-player accumulators.
    pub player_scores: Vec<PlayerScoreEntity>,
    /// Append-only audit log.
    pub events: Vec<GameEventEntity>,
}

/// Room-level game state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Player-facing join key (uppercase).
    pub room_code: String,
    /// Identifier of the player who created the room.
    pub host_id: String,
    /// Number of rounds to play.
    pub total_rounds: u32,
    /// Current round, 1-based.
    pub current_round: u32,
    /// Current lifecycle phase.
    pub phase: GamePhase,
    /// Target and describer of the current turn; both are set or both absent.
    pub turn: Option<TurnEntity>,
    /// Players who have described in the current round, in order.
    pub describers_this_round: Vec<String>,
    /// Players who acknowledged the reveal and want to move on.
    pub players_ready_for_next_round: Vec<String>,
    /// When the current turn started.
    pub round_started_at: Option<SystemTime>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the game row changed.
    pub updated_at: SystemTime,
}

/// Hidden target shown to the current describer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnEntity {
    /// Target value on the 1-24 dial.
    pub target: i32,
    /// Identifier of the player describing the target.
    pub describer_id: String,
    /// Labels of both ends of the dial.
    pub spectrum_pair: Option<SpectrumPairEntity>,
}

/// Pair of opposite concepts labelling the two ends of the dial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpectrumPairEntity {
    /// Label at the low end (1).
    pub left: String,
    /// Label at the high end (24).
    pub right: String,
}

/// Participant of a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Client-minted stable identifier.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Presence flag maintained by heartbeats.
    pub is_online: bool,
    /// Whether the player currently describes.
    pub is_describer: bool,
    /// Join timestamp.
    pub joined_at: SystemTime,
}

/// A player's answer for a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessEntity {
    /// Guessing player.
    pub player_id: String,
    /// Round the guess belongs to.
    pub round: u32,
    /// Position on the dial.
    pub value: i32,
    /// Last time the guess was written.
    pub submitted_at: SystemTime,
}

/// Snapshot written once when a round is finalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResultEntity {
    /// Round number, 1-based.
    pub round: u32,
    /// Target of the last describer turn of the round.
    pub target: i32,
    /// Every guess of the round with its score.
    pub guesses: Vec<ScoredGuessEntity>,
    /// Finalization time.
    pub created_at: SystemTime,
}

/// A guess alongside the points it earned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredGuessEntity {
    /// Guessing player.
    pub player_id: String,
    /// Position on the dial.
    pub guess: i32,
    /// Points earned, 0 to 4.
    pub score: u8,
}

/// Running score of a player across rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerScoreEntity {
    /// Owning player.
    pub player_id: String,
    /// Sum of every entry in `round_scores`.
    pub total_score: u32,
    /// One entry per finalized round, in round order.
    pub round_scores: Vec<RoundScoreEntity>,
    /// Last time an entry was added.
    pub updated_at: SystemTime,
}

/// Points earned by a player in one round, describer bonus included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundScoreEntity {
    /// Round number, 1-based.
    pub round: u32,
    /// Guess score plus the describer bonus.
    pub score: u32,
    /// The player described during the round.
    pub is_describer: bool,
}

/// Kinds of audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameEventKind {
    /// Host started a round.
    GameStarted,
    /// A guess was recorded or overwritten.
    GuessSubmitted,
    /// Guesses were revealed or the round was finalized.
    RoundEnded,
    /// Another player took over describing.
    DescriberSwitched,
}

/// Audit log entry, written by the engine and only read for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEventEntity {
    /// What happened.
    pub kind: GameEventKind,
    /// Acting player, or `system` for timer-driven actions.
    pub player_id: String,
    /// Kind specific payload.
    pub data: Value,
    /// When the event was recorded.
    pub timestamp: SystemTime,
}

impl GameEventKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            GameEventKind::GameStarted => "game_started",
            GameEventKind::GuessSubmitted => "guess_submitted",
            GameEventKind::RoundEnded => "round_ended",
            GameEventKind::DescriberSwitched => "describer_switched",
        }
    }
}

// `serde_json::Value` is not `Eq`, but its `PartialEq` is total.
impl Eq for GameEventEntity {}

impl GameRecord {
    /// Look up a player of this game by identifier.
    pub fn player(&self, user_id: &str) -> Option<&PlayerEntity> {
        self.players.iter().find(|player| player.user_id == user_id)
    }

    /// Player identifiers in join order.
    pub fn roster(&self) -> Vec<&str> {
        self.players
            .iter()
            .map(|player| player.user_id.as_str())
            .collect()
    }

    /// Guesses recorded for the current round.
    pub fn current_round_guesses(&self) -> impl Iterator<Item = &GuessEntity> {
        let round = self.game.current_round;
        self.guesses.iter().filter(move |guess| guess.round == round)
    }

    /// Identifier of the current describer, if a turn is in play.
    pub fn describer_id(&self) -> Option<&str> {
        self.game
            .turn
            .as_ref()
            .map(|turn| turn.describer_id.as_str())
    }
}
