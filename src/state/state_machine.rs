use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// High-level phases a game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Players gather in the room; the host can start the next round.
    Waiting,
    /// The describer gives a clue and the other players submit guesses.
    Playing,
    /// Guesses are revealed against the target.
    Scoring,
    /// All configured rounds have been played.
    Finished,
}

/// How a closed round hands over to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundHandover {
    /// Park the room in `waiting` until the host starts the next round.
    AwaitHost,
    /// Start the next round straight away.
    AutoStart,
}

/// Events that drive phase changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Host starts play from the waiting room.
    StartGame,
    /// Every non-describer has a guess recorded for the current round.
    AllGuessesIn,
    /// The describer role moved to the next player within the round.
    DescriberRotated,
    /// The round was scored and persisted.
    RoundClosed {
        /// Whether the closed round was the last configured one.
        last_round: bool,
        /// What happens when more rounds remain.
        handover: RoundHandover,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the game was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

impl GamePhase {
    /// Compute the phase reached by applying `event`, if the transition is valid.
    pub fn next(self, event: PhaseEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self, event) {
            (GamePhase::Waiting, PhaseEvent::StartGame) => GamePhase::Playing,
            (GamePhase::Playing, PhaseEvent::AllGuessesIn) => GamePhase::Scoring,
            (GamePhase::Playing | GamePhase::Scoring, PhaseEvent::DescriberRotated) => {
                GamePhase::Playing
            }
            (
                GamePhase::Playing | GamePhase::Scoring,
                PhaseEvent::RoundClosed {
                    last_round: true, ..
                },
            ) => GamePhase::Finished,
            (
                GamePhase::Playing | GamePhase::Scoring,
                PhaseEvent::RoundClosed { handover, .. },
            ) => match handover {
                RoundHandover::AwaitHost => GamePhase::Waiting,
                RoundHandover::AutoStart => GamePhase::Playing,
            },
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
