//! Round lifecycle engine.
//!
//! Every operation validates its preconditions against a [`GameRecord`] and
//! then applies all derived changes to it in memory. Callers persist the
//! record with a single compare-and-update, so an operation that returns an
//! error has written nothing.

use std::time::SystemTime;

use rand::Rng;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{
        GameEntity, GameEventEntity, GameEventKind, GameRecord, GuessEntity, PlayerEntity,
        PlayerScoreEntity, RoundResultEntity, RoundScoreEntity, ScoredGuessEntity, TurnEntity,
    },
    state::{
        game::{DIAL_MAX, DIAL_MIDPOINT, DIAL_MIN, Dealer},
        rotation::{first_describer_for_round, next_describer},
        scoring::score,
        state_machine::{GamePhase, InvalidTransition, PhaseEvent, RoundHandover},
    },
};

/// Extra points for every player who described during a round.
pub const DESCRIBER_BONUS: u32 = 1;
/// Actor recorded for timer-driven actions.
pub const SYSTEM_ACTOR: &str = "system";

/// Typed failures of lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Referenced game or player does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The current phase forbids the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Actor is not the host.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Actor does not hold the role the operation requires.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Malformed input.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<InvalidTransition> for LifecycleError {
    fn from(err: InvalidTransition) -> Self {
        LifecycleError::InvalidState(err.to_string())
    }
}

/// Whether a join created a player or reactivated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new player row was added.
    Joined,
    /// The player was already in the game and is back online.
    Rejoined,
}

/// Result of recording a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessOutcome {
    /// Every non-describer has answered and the game moved to scoring.
    pub all_submitted: bool,
}

/// Result of the timer-driven forced advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSubmitOutcome {
    /// The game was not collecting guesses; nothing changed.
    Skipped,
    /// Default guesses were filled in and the round was revealed.
    Revealed {
        /// Number of midpoint guesses filled in.
        defaults: usize,
    },
}

/// Summary of a finalized round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundClosed {
    /// Number of the round that was closed.
    pub round: u32,
    /// The closed round was the last one.
    pub finished: bool,
}

/// What happened to the describer turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Another player describes a fresh target within the same round.
    Rotated {
        /// The new describer.
        describer_id: String,
    },
    /// Everybody described; the round was scored and closed.
    Closed(RoundClosed),
}

/// Result of a ready acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Still waiting for other players.
    Pending { ready: usize, needed: usize },
    /// The whole roster is ready and play moved on.
    Advanced(TurnOutcome),
}

/// Build a new game in the waiting room with the host as its only player.
pub fn new_game(
    id: Uuid,
    room_code: &str,
    host_id: &str,
    host_username: &str,
    total_rounds: i64,
    now: SystemTime,
) -> Result<GameRecord, LifecycleError> {
    let total_rounds = u32::try_from(total_rounds)
        .ok()
        .filter(|rounds| *rounds > 0)
        .ok_or_else(|| {
            LifecycleError::Validation(format!(
                "total rounds must be a positive integer, got {total_rounds}"
            ))
        })?;

    if host_id.trim().is_empty() {
        return Err(LifecycleError::Validation(
            "host id must not be empty".into(),
        ));
    }

    Ok(GameRecord {
        version: 0,
        game: GameEntity {
            id,
            room_code: normalize_room_code(room_code),
            host_id: host_id.to_owned(),
            total_rounds,
            current_round: 1,
            phase: GamePhase::Waiting,
            turn: None,
            describers_this_round: Vec::new(),
            players_ready_for_next_round: Vec::new(),
            round_started_at: None,
            created_at: now,
            updated_at: now,
        },
        players: vec![PlayerEntity {
            user_id: host_id.to_owned(),
            username: host_username.to_owned(),
            is_online: true,
            is_describer: true,
            joined_at: now,
        }],
        guesses: Vec::new(),
        round_results: Vec::new(),
        player_scores: Vec::new(),
        events: Vec::new(),
    })
}

/// Room codes are matched in their uppercase form.
pub fn normalize_room_code(room_code: &str) -> String {
    room_code.trim().to_uppercase()
}

impl GameRecord {
    /// Add a player to the room, or bring an existing one back online.
    pub fn join(
        &mut self,
        user_id: &str,
        username: &str,
        now: SystemTime,
    ) -> Result<JoinOutcome, LifecycleError> {
        if self.game.phase == GamePhase::Finished {
            return Err(LifecycleError::InvalidState(
                "game has already finished".into(),
            ));
        }

        if let Some(player) = self
            .players
            .iter_mut()
            .find(|player| player.user_id == user_id)
        {
            player.is_online = true;
            player.username = username.to_owned();
            return Ok(JoinOutcome::Rejoined);
        }

        self.players.push(PlayerEntity {
            user_id: user_id.to_owned(),
            username: username.to_owned(),
            is_online: true,
            is_describer: false,
            joined_at: now,
        });
        Ok(JoinOutcome::Joined)
    }

    /// Host starts the current round: the host describes a freshly drawn target.
    pub fn start_game<R: Rng + ?Sized>(
        &mut self,
        host_id: &str,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<(), LifecycleError> {
        if self.game.host_id != host_id {
            return Err(LifecycleError::Unauthorized(
                "only the host can start the game".into(),
            ));
        }
        self.ensure_phase(GamePhase::Waiting, "start the game")?;

        let next = self.game.phase.next(PhaseEvent::StartGame)?;
        let now = dealer.now();
        let turn = dealer.deal_turn(host_id);
        let target = turn.target;

        self.install_turn(turn);
        self.game.phase = next;
        self.game.describers_this_round = vec![host_id.to_owned()];
        self.game.players_ready_for_next_round.clear();
        self.game.round_started_at = Some(now);
        self.game.updated_at = now;
        self.record_event(
            GameEventKind::GameStarted,
            host_id,
            json!({ "target": target }),
            now,
        );
        Ok(())
    }

    /// Record or overwrite a player's guess, revealing once everybody answered.
    pub fn submit_guess(
        &mut self,
        player_id: &str,
        value: i32,
        now: SystemTime,
    ) -> Result<GuessOutcome, LifecycleError> {
        self.ensure_phase(GamePhase::Playing, "submit a guess")?;

        let player = self
            .player(player_id)
            .ok_or_else(|| LifecycleError::NotFound(format!("player `{player_id}` not found")))?;
        if player.is_describer {
            return Err(LifecycleError::Forbidden(
                "describers cannot submit guesses".into(),
            ));
        }
        if !(DIAL_MIN..=DIAL_MAX).contains(&value) {
            return Err(LifecycleError::Validation(format!(
                "guess must be between {DIAL_MIN} and {DIAL_MAX}, got {value}"
            )));
        }

        let round = self.game.current_round;
        match self
            .guesses
            .iter_mut()
            .find(|guess| guess.round == round && guess.player_id == player_id)
        {
            Some(existing) => {
                existing.value = value;
                existing.submitted_at = now;
            }
            None => self.guesses.push(GuessEntity {
                player_id: player_id.to_owned(),
                round,
                value,
                submitted_at: now,
            }),
        }

        let all_submitted = self.all_guesses_in();
        if all_submitted {
            self.reveal(
                player_id,
                json!({
                    "round": round,
                    "target": self.current_target(),
                    "auto_reveal": true,
                    "all_submitted": true,
                }),
                now,
            )?;
        }

        self.record_event(
            GameEventKind::GuessSubmitted,
            player_id,
            json!({
                "guess": value,
                "round": round,
                "all_submitted": all_submitted,
            }),
            now,
        );
        Ok(GuessOutcome { all_submitted })
    }

    /// Fill in the midpoint for every silent player and reveal the round.
    ///
    /// Does nothing when the game is not collecting guesses, so the timer can
    /// fire late or twice.
    pub fn auto_submit_guesses(
        &mut self,
        now: SystemTime,
    ) -> Result<AutoSubmitOutcome, LifecycleError> {
        if self.game.phase != GamePhase::Playing {
            return Ok(AutoSubmitOutcome::Skipped);
        }

        let round = self.game.current_round;
        let describer = self.describer_id();
        let silent: Vec<String> = self
            .players
            .iter()
            .filter(|player| Some(player.user_id.as_str()) != describer)
            .filter(|player| {
                !self
                    .current_round_guesses()
                    .any(|guess| guess.player_id == player.user_id)
            })
            .map(|player| player.user_id.clone())
            .collect();

        for player_id in &silent {
            self.guesses.push(GuessEntity {
                player_id: player_id.clone(),
                round,
                value: DIAL_MIDPOINT,
                submitted_at: now,
            });
        }

        if self.all_guesses_in() {
            self.reveal(
                SYSTEM_ACTOR,
                json!({
                    "round": round,
                    "target": self.current_target(),
                    "auto_reveal": true,
                    "all_submitted": true,
                    "timer_expired": true,
                }),
                now,
            )?;
        }

        Ok(AutoSubmitOutcome::Revealed {
            defaults: silent.len(),
        })
    }

    /// Current describer hands over to the next player, or closes the round.
    ///
    /// Guesses already recorded for the round are kept.
    pub fn switch_describer<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<TurnOutcome, LifecycleError> {
        self.ensure_phase(GamePhase::Playing, "switch describer")?;
        self.ensure_current_describer(player_id, "only the current describer can switch")?;

        match self.next_describer() {
            Some(next) => self.rotate_describer(player_id, next, dealer),
            None => self
                .finalize_round(player_id, RoundHandover::AwaitHost, dealer)
                .map(TurnOutcome::Closed),
        }
    }

    /// Describer closes the round while guesses are still being collected.
    pub fn end_round<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<RoundClosed, LifecycleError> {
        self.ensure_phase(GamePhase::Playing, "end the round")?;
        self.ensure_current_describer(player_id, "only the describer can end the round")?;
        self.finalize_round(player_id, RoundHandover::AwaitHost, dealer)
    }

    /// Describer closes the round from the reveal screen.
    pub fn continue_to_next_round<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<RoundClosed, LifecycleError> {
        self.ensure_phase(GamePhase::Scoring, "continue to the next round")?;
        self.ensure_current_describer(
            player_id,
            "only the describer can continue to the next round",
        )?;
        self.finalize_round(player_id, RoundHandover::AwaitHost, dealer)
    }

    /// Acknowledge the reveal; once everybody is ready play moves on.
    ///
    /// With describers left this round the next one gets a clean slate: the
    /// round's guesses are dropped. Otherwise the round is closed and the
    /// next round starts immediately.
    pub fn mark_ready_for_next_round<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<ReadyOutcome, LifecycleError> {
        self.ensure_phase(GamePhase::Scoring, "mark ready")?;
        if self.player(player_id).is_none() {
            return Err(LifecycleError::NotFound(format!(
                "player `{player_id}` not found in game"
            )));
        }

        let needed = self.players.len();
        let ready = &mut self.game.players_ready_for_next_round;
        if ready.iter().any(|id| id == player_id) {
            return Ok(ReadyOutcome::Pending {
                ready: ready.len(),
                needed,
            });
        }
        ready.push(player_id.to_owned());
        self.game.updated_at = dealer.now();

        let everyone_ready = self.players.iter().all(|player| {
            self.game
                .players_ready_for_next_round
                .contains(&player.user_id)
        });
        if !everyone_ready {
            return Ok(ReadyOutcome::Pending {
                ready: self.game.players_ready_for_next_round.len(),
                needed,
            });
        }

        let outcome = match self.next_describer() {
            None => TurnOutcome::Closed(self.finalize_round(
                player_id,
                RoundHandover::AutoStart,
                dealer,
            )?),
            Some(next) => {
                let round = self.game.current_round;
                self.guesses.retain(|guess| guess.round != round);
                self.game.players_ready_for_next_round.clear();
                self.game.round_started_at = Some(dealer.now());
                self.rotate_describer(player_id, next, dealer)?
            }
        };
        Ok(ReadyOutcome::Advanced(outcome))
    }

    /// Presence heartbeat.
    pub fn set_player_online(
        &mut self,
        player_id: &str,
        is_online: bool,
    ) -> Result<(), LifecycleError> {
        let player = self
            .players
            .iter_mut()
            .find(|player| player.user_id == player_id)
            .ok_or_else(|| LifecycleError::NotFound(format!("player `{player_id}` not found")))?;
        player.is_online = is_online;
        Ok(())
    }

    fn ensure_phase(&self, expected: GamePhase, action: &str) -> Result<(), LifecycleError> {
        if self.game.phase == expected {
            return Ok(());
        }

        Err(LifecycleError::InvalidState(format!(
            "cannot {action} while the game is {:?}, expected {:?}",
            self.game.phase, expected
        )))
    }

    fn ensure_current_describer(&self, player_id: &str, denial: &str) -> Result<(), LifecycleError> {
        let player = self
            .player(player_id)
            .ok_or_else(|| LifecycleError::NotFound(format!("player `{player_id}` not found")))?;
        if player.is_describer && self.describer_id() == Some(player_id) {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(denial.to_owned()))
        }
    }

    fn current_target(&self) -> Option<i32> {
        self.game.turn.as_ref().map(|turn| turn.target)
    }

    fn next_describer(&self) -> Option<String> {
        next_describer(&self.roster(), &self.game.describers_this_round).map(str::to_owned)
    }

    fn all_guesses_in(&self) -> bool {
        let describer = self.describer_id();
        self.players
            .iter()
            .filter(|player| Some(player.user_id.as_str()) != describer)
            .all(|player| {
                self.current_round_guesses()
                    .any(|guess| guess.player_id == player.user_id)
            })
    }

    fn reveal(&mut self, actor: &str, data: Value, now: SystemTime) -> Result<(), LifecycleError> {
        self.game.phase = self.game.phase.next(PhaseEvent::AllGuessesIn)?;
        self.game.updated_at = now;
        self.record_event(GameEventKind::RoundEnded, actor, data, now);
        Ok(())
    }

    /// Point the turn and every player's describer flag at `turn.describer_id`.
    fn install_turn(&mut self, turn: TurnEntity) {
        for player in &mut self.players {
            player.is_describer = player.user_id == turn.describer_id;
        }
        self.game.turn = Some(turn);
    }

    fn rotate_describer<R: Rng + ?Sized>(
        &mut self,
        actor: &str,
        next: String,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<TurnOutcome, LifecycleError> {
        let phase = self.game.phase.next(PhaseEvent::DescriberRotated)?;
        let now = dealer.now();
        let turn = dealer.deal_turn(&next);
        let new_target = turn.target;

        self.install_turn(turn);
        self.game.phase = phase;
        self.game.describers_this_round.push(next.clone());
        self.game.updated_at = now;
        self.record_event(
            GameEventKind::DescriberSwitched,
            actor,
            json!({
                "new_describer": next,
                "new_target": new_target,
                "describers_this_round": self.game.describers_this_round,
            }),
            now,
        );

        Ok(TurnOutcome::Rotated { describer_id: next })
    }

    /// Score the round, persist its result, and hand over to the next round.
    fn finalize_round<R: Rng + ?Sized>(
        &mut self,
        actor: &str,
        handover: RoundHandover,
        dealer: &mut Dealer<'_, R>,
    ) -> Result<RoundClosed, LifecycleError> {
        let round = self.game.current_round;
        let target = self
            .current_target()
            .ok_or_else(|| LifecycleError::InvalidState("no target in play".into()))?;
        let last_round = round >= self.game.total_rounds;
        let next_phase = self.game.phase.next(PhaseEvent::RoundClosed {
            last_round,
            handover,
        })?;
        let next_describer = if last_round {
            None
        } else {
            let describer = first_describer_for_round(&self.roster(), round + 1)
                .map(str::to_owned)
                .ok_or_else(|| LifecycleError::InvalidState("game has no players".into()))?;
            Some(describer)
        };

        let now = dealer.now();
        let scored: Vec<ScoredGuessEntity> = self
            .current_round_guesses()
            .map(|guess| ScoredGuessEntity {
                player_id: guess.player_id.clone(),
                guess: guess.value,
                score: score(guess.value, target),
            })
            .collect();

        self.round_results.push(RoundResultEntity {
            round,
            target,
            guesses: scored.clone(),
            created_at: now,
        });
        self.accrue_scores(round, &scored, now);

        match next_describer {
            Some(describer) => {
                let turn = dealer.deal_turn(&describer);
                self.install_turn(turn);
                self.game.current_round = round + 1;
                self.game.describers_this_round = vec![describer];
                self.game.round_started_at = Some(now);
            }
            None => {
                for player in &mut self.players {
                    player.is_describer = false;
                }
                self.game.turn = None;
                self.game.describers_this_round.clear();
                self.game.round_started_at = None;
            }
        }
        self.game.phase = next_phase;
        self.game.players_ready_for_next_round.clear();
        self.game.updated_at = now;
        self.record_event(
            GameEventKind::RoundEnded,
            actor,
            json!({
                "round": round,
                "target": target,
                "scores": scored,
                "finished": last_round,
            }),
            now,
        );

        Ok(RoundClosed {
            round,
            finished: last_round,
        })
    }

    /// Append this round's entry to every player's accumulator.
    fn accrue_scores(&mut self, round: u32, scored: &[ScoredGuessEntity], now: SystemTime) {
        for player in &self.players {
            let guess_score = scored
                .iter()
                .find(|guess| guess.player_id == player.user_id)
                .map_or(0, |guess| u32::from(guess.score));
            let is_describer = self
                .game
                .describers_this_round
                .contains(&player.user_id);
            let entry = RoundScoreEntity {
                round,
                score: guess_score + if is_describer { DESCRIBER_BONUS } else { 0 },
                is_describer,
            };

            match self
                .player_scores
                .iter_mut()
                .find(|existing| existing.player_id == player.user_id)
            {
                Some(existing) => {
                    existing.round_scores.push(entry);
                    existing.total_score = existing.round_scores.iter().map(|rs| rs.score).sum();
                    existing.updated_at = now;
                }
                None => self.player_scores.push(PlayerScoreEntity {
                    player_id: player.user_id.clone(),
                    total_score: entry.score,
                    round_scores: vec![entry],
                    updated_at: now,
                }),
            }
        }
    }

    fn record_event(&mut self, kind: GameEventKind, actor: &str, data: Value, now: SystemTime) {
        self.events.push(GameEventEntity {
            kind,
            player_id: actor.to_owned(),
            data,
            timestamp: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    const HOST: &str = "host";
    const GUEST: &str = "guest";
    const LATE: &str = "late";

    struct Table {
        record: GameRecord,
        rng: StdRng,
    }

    impl Table {
        fn new(total_rounds: i64, guests: &[&str]) -> Self {
            let now = SystemTime::now();
            let mut record =
                new_game(Uuid::new_v4(), "abc123", HOST, "Host", total_rounds, now).unwrap();
            for guest in guests {
                record.join(guest, guest, now).unwrap();
            }
            Self {
                record,
                rng: StdRng::seed_from_u64(42),
            }
        }

        fn start(&mut self) {
            let mut dealer = Dealer::new(&mut self.rng, &[], SystemTime::now());
            self.record.start_game(HOST, &mut dealer).unwrap();
        }

        fn switch(&mut self, player_id: &str) -> Result<TurnOutcome, LifecycleError> {
            let mut dealer = Dealer::new(&mut self.rng, &[], SystemTime::now());
            self.record.switch_describer(player_id, &mut dealer)
        }

        fn continue_round(&mut self, player_id: &str) -> Result<RoundClosed, LifecycleError> {
            let mut dealer = Dealer::new(&mut self.rng, &[], SystemTime::now());
            self.record.continue_to_next_round(player_id, &mut dealer)
        }

        fn end_round(&mut self, player_id: &str) -> Result<RoundClosed, LifecycleError> {
            let mut dealer = Dealer::new(&mut self.rng, &[], SystemTime::now());
            self.record.end_round(player_id, &mut dealer)
        }

        fn ready(&mut self, player_id: &str) -> Result<ReadyOutcome, LifecycleError> {
            let mut dealer = Dealer::new(&mut self.rng, &[], SystemTime::now());
            self.record.mark_ready_for_next_round(player_id, &mut dealer)
        }

        fn guess(&mut self, player_id: &str, value: i32) -> Result<GuessOutcome, LifecycleError> {
            self.record.submit_guess(player_id, value, SystemTime::now())
        }

        fn target(&self) -> i32 {
            self.record.game.turn.as_ref().unwrap().target
        }

        /// A dial value exactly `distance` away from the target.
        fn off_target(&self, distance: i32) -> i32 {
            let target = self.target();
            if target + distance <= DIAL_MAX {
                target + distance
            } else {
                target - distance
            }
        }

        fn phase(&self) -> GamePhase {
            self.record.game.phase
        }

        fn score_of(&self, player_id: &str) -> &PlayerScoreEntity {
            self.record
                .player_scores
                .iter()
                .find(|score| score.player_id == player_id)
                .unwrap()
        }

        fn events_of(&self, kind: GameEventKind) -> Vec<&GameEventEntity> {
            self.record
                .events
                .iter()
                .filter(|event| event.kind == kind)
                .collect()
        }
    }

    #[test]
    fn new_game_waits_with_host_as_describer() {
        let table = Table::new(3, &[]);
        let game = &table.record.game;

        assert_eq!(game.phase, GamePhase::Waiting);
        assert_eq!(game.current_round, 1);
        assert_eq!(game.room_code, "ABC123");
        assert!(game.turn.is_none());
        assert_eq!(table.record.players.len(), 1);
        assert!(table.record.players[0].is_describer);
    }

    #[test]
    fn rejects_non_positive_round_counts() {
        for rounds in [0, -3] {
            let err = new_game(Uuid::new_v4(), "ROOM01", HOST, "Host", rounds, SystemTime::now())
                .unwrap_err();
            assert!(matches!(err, LifecycleError::Validation(_)));
        }
    }

    #[test]
    fn rejoin_reactivates_instead_of_duplicating() {
        let mut table = Table::new(1, &[GUEST]);
        table.record.set_player_online(GUEST, false).unwrap();

        let outcome = table
            .record
            .join(GUEST, "Renamed", SystemTime::now())
            .unwrap();

        assert_eq!(outcome, JoinOutcome::Rejoined);
        assert_eq!(table.record.players.len(), 2);
        let guest = table.record.player(GUEST).unwrap();
        assert!(guest.is_online);
        assert_eq!(guest.username, "Renamed");
        assert!(!guest.is_describer);
    }

    #[test]
    fn joining_a_finished_game_is_rejected() {
        let mut table = Table::new(1, &[GUEST]);
        table.record.game.phase = GamePhase::Finished;

        let err = table
            .record
            .join(LATE, "Late", SystemTime::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn only_the_host_can_start() {
        let mut table = Table::new(1, &[GUEST]);
        let mut dealer = Dealer::new(&mut table.rng, &[], SystemTime::now());

        let err = table.record.start_game(GUEST, &mut dealer).unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(_)));
        assert_eq!(table.record.game.phase, GamePhase::Waiting);
    }

    #[test]
    fn starting_twice_is_an_invalid_state() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();
        let mut dealer = Dealer::new(&mut table.rng, &[], SystemTime::now());

        let err = table.record.start_game(HOST, &mut dealer).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn start_deals_target_to_host() {
        let mut table = Table::new(2, &[GUEST]);
        table.start();

        let game = &table.record.game;
        assert_eq!(game.phase, GamePhase::Playing);
        assert_eq!(game.describers_this_round, vec![HOST.to_string()]);
        assert_eq!(table.record.describer_id(), Some(HOST));
        assert!((DIAL_MIN..=DIAL_MAX).contains(&table.target()));
        assert!(game.round_started_at.is_some());
        assert_eq!(table.events_of(GameEventKind::GameStarted).len(), 1);
    }

    #[test]
    fn guessing_outside_playing_is_rejected() {
        let mut table = Table::new(1, &[GUEST]);
        let err = table.guess(GUEST, 12).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn describer_cannot_guess() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();

        let err = table.guess(HOST, 12).unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
    }

    #[test]
    fn unknown_player_cannot_guess() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();

        let err = table.guess("stranger", 12).unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[test]
    fn guesses_off_the_dial_are_rejected() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();

        for value in [0, 25, -1] {
            let err = table.guess(GUEST, value).unwrap_err();
            assert!(matches!(err, LifecycleError::Validation(_)));
        }
        assert!(table.record.guesses.is_empty());
    }

    #[test]
    fn resubmitting_overwrites_the_guess() {
        let mut table = Table::new(1, &[GUEST, LATE]);
        table.start();

        table.guess(GUEST, 3).unwrap();
        table.guess(GUEST, 20).unwrap();

        let guesses: Vec<_> = table.record.current_round_guesses().collect();
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].value, 20);
        assert_eq!(table.phase(), GamePhase::Playing);
    }

    #[test]
    fn reveals_once_every_guesser_answered_in_any_order() {
        for order in [[GUEST, LATE], [LATE, GUEST]] {
            let mut table = Table::new(1, &[GUEST, LATE]);
            table.start();

            let first = table.guess(order[0], 5).unwrap();
            assert!(!first.all_submitted);
            assert_eq!(table.phase(), GamePhase::Playing);

            let second = table.guess(order[1], 6).unwrap();
            assert!(second.all_submitted);
            assert_eq!(table.phase(), GamePhase::Scoring);

            let reveal = table.events_of(GameEventKind::RoundEnded);
            assert_eq!(reveal.len(), 1);
            assert_eq!(reveal[0].data["auto_reveal"], true);
        }
    }

    #[test]
    fn auto_submit_fills_midpoint_and_reveals() {
        let mut table = Table::new(1, &[GUEST, LATE]);
        table.start();
        table.guess(GUEST, 7).unwrap();

        let outcome = table.record.auto_submit_guesses(SystemTime::now()).unwrap();

        assert_eq!(outcome, AutoSubmitOutcome::Revealed { defaults: 1 });
        assert_eq!(table.phase(), GamePhase::Scoring);
        let late = table
            .record
            .current_round_guesses()
            .find(|guess| guess.player_id == LATE)
            .unwrap();
        assert_eq!(late.value, DIAL_MIDPOINT);
        let guest = table
            .record
            .current_round_guesses()
            .find(|guess| guess.player_id == GUEST)
            .unwrap();
        assert_eq!(guest.value, 7);

        let reveal = table.events_of(GameEventKind::RoundEnded);
        assert_eq!(reveal[0].player_id, SYSTEM_ACTOR);
        assert_eq!(reveal[0].data["timer_expired"], true);
    }

    #[test]
    fn auto_submit_is_a_no_op_once_advanced() {
        let mut table = Table::new(1, &[GUEST]);
        assert_eq!(
            table.record.auto_submit_guesses(SystemTime::now()).unwrap(),
            AutoSubmitOutcome::Skipped
        );

        table.start();
        table.guess(GUEST, 12).unwrap();
        let before = table.record.clone();

        assert_eq!(
            table.record.auto_submit_guesses(SystemTime::now()).unwrap(),
            AutoSubmitOutcome::Skipped
        );
        assert_eq!(table.record, before);
    }

    #[test]
    fn switching_visits_every_player_then_closes_the_round() {
        let mut table = Table::new(2, &[GUEST, LATE]);
        table.start();

        assert_eq!(
            table.switch(HOST).unwrap(),
            TurnOutcome::Rotated {
                describer_id: GUEST.into()
            }
        );
        assert_eq!(table.record.describer_id(), Some(GUEST));
        assert!(table.record.player(GUEST).unwrap().is_describer);
        assert!(!table.record.player(HOST).unwrap().is_describer);

        assert_eq!(
            table.switch(GUEST).unwrap(),
            TurnOutcome::Rotated {
                describer_id: LATE.into()
            }
        );
        assert_eq!(
            table.record.game.describers_this_round,
            vec![HOST.to_string(), GUEST.to_string(), LATE.to_string()]
        );

        let closed = table.switch(LATE).unwrap();
        assert_eq!(
            closed,
            TurnOutcome::Closed(RoundClosed {
                round: 1,
                finished: false
            })
        );
        assert_eq!(table.phase(), GamePhase::Waiting);
        assert_eq!(table.record.game.current_round, 2);
        assert_eq!(table.record.round_results.len(), 1);
        assert_eq!(table.events_of(GameEventKind::DescriberSwitched).len(), 2);
    }

    #[test]
    fn switching_keeps_earlier_guesses_of_the_round() {
        let mut table = Table::new(1, &[GUEST, LATE]);
        table.start();
        table.guess(GUEST, 9).unwrap();

        table.switch(HOST).unwrap();

        assert_eq!(table.record.current_round_guesses().count(), 1);
        assert_eq!(table.phase(), GamePhase::Playing);
    }

    #[test]
    fn only_the_current_describer_may_switch() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();

        assert!(matches!(
            table.switch(GUEST).unwrap_err(),
            LifecycleError::Forbidden(_)
        ));
        assert!(matches!(
            table.switch("stranger").unwrap_err(),
            LifecycleError::NotFound(_)
        ));
    }

    #[test]
    fn describer_bonus_applies_without_a_guess() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();
        let miss = table.off_target(6);
        table.guess(GUEST, miss).unwrap();
        table.continue_round(HOST).unwrap();

        let host = table.score_of(HOST);
        assert_eq!(host.total_score, 1);
        assert_eq!(
            host.round_scores,
            vec![RoundScoreEntity {
                round: 1,
                score: 1,
                is_describer: true
            }]
        );
        assert_eq!(table.score_of(GUEST).total_score, 0);
    }

    #[test]
    fn scores_accumulate_across_rounds_in_order() {
        let mut table = Table::new(2, &[GUEST]);

        table.start();
        let close = table.off_target(1);
        table.guess(GUEST, close).unwrap();
        table.continue_round(HOST).unwrap();
        assert_eq!(table.phase(), GamePhase::Waiting);

        table.start();
        let far = table.off_target(3);
        table.guess(GUEST, far).unwrap();
        let closed = table.continue_round(HOST).unwrap();
        assert!(closed.finished);

        let guest = table.score_of(GUEST);
        assert_eq!(guest.total_score, 4);
        let per_round: Vec<_> = guest
            .round_scores
            .iter()
            .map(|entry| (entry.round, entry.score, entry.is_describer))
            .collect();
        assert_eq!(per_round, vec![(1, 3, false), (2, 1, false)]);
        assert_eq!(table.score_of(HOST).total_score, 2);
    }

    #[test]
    fn single_round_game_finishes_after_continue() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();
        let target = table.target();

        let outcome = table.guess(GUEST, 12).unwrap();
        assert!(outcome.all_submitted);
        assert_eq!(table.phase(), GamePhase::Scoring);

        let closed = table.continue_round(HOST).unwrap();
        assert_eq!(
            closed,
            RoundClosed {
                round: 1,
                finished: true
            }
        );

        let game = &table.record.game;
        assert_eq!(game.phase, GamePhase::Finished);
        assert_eq!(game.current_round, 1);
        assert!(game.turn.is_none());
        assert!(game.describers_this_round.is_empty());
        assert!(table.record.players.iter().all(|p| !p.is_describer));

        assert_eq!(table.record.round_results.len(), 1);
        let result = &table.record.round_results[0];
        assert_eq!(result.target, target);
        assert_eq!(
            result.guesses,
            vec![ScoredGuessEntity {
                player_id: GUEST.into(),
                guess: 12,
                score: score(12, target),
            }]
        );
    }

    #[test]
    fn only_the_describer_continues() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();
        table.guess(GUEST, 12).unwrap();

        assert!(matches!(
            table.continue_round(GUEST).unwrap_err(),
            LifecycleError::Forbidden(_)
        ));
        assert_eq!(table.phase(), GamePhase::Scoring);
        assert!(table.record.round_results.is_empty());
    }

    #[test]
    fn end_round_closes_while_playing() {
        let mut table = Table::new(3, &[GUEST, LATE]);
        table.start();
        table.guess(GUEST, 4).unwrap();

        let closed = table.end_round(HOST).unwrap();

        assert_eq!(closed.round, 1);
        assert!(!closed.finished);
        assert_eq!(table.phase(), GamePhase::Waiting);
        assert_eq!(table.record.round_results[0].guesses.len(), 1);
        assert!(matches!(
            table.end_round(HOST).unwrap_err(),
            LifecycleError::InvalidState(_)
        ));
    }

    #[test]
    fn ready_quorum_rotates_and_clears_the_slate() {
        let mut table = Table::new(2, &[GUEST, LATE]);
        table.start();
        table.guess(GUEST, 3).unwrap();
        table.guess(LATE, 4).unwrap();
        assert_eq!(table.phase(), GamePhase::Scoring);

        assert_eq!(
            table.ready(GUEST).unwrap(),
            ReadyOutcome::Pending {
                ready: 1,
                needed: 3
            }
        );
        assert_eq!(
            table.ready(GUEST).unwrap(),
            ReadyOutcome::Pending {
                ready: 1,
                needed: 3
            }
        );
        table.ready(LATE).unwrap();
        let outcome = table.ready(HOST).unwrap();

        assert_eq!(
            outcome,
            ReadyOutcome::Advanced(TurnOutcome::Rotated {
                describer_id: GUEST.into()
            })
        );
        assert_eq!(table.phase(), GamePhase::Playing);
        assert_eq!(table.record.game.current_round, 1);
        assert_eq!(table.record.current_round_guesses().count(), 0);
        assert!(table.record.game.players_ready_for_next_round.is_empty());
        assert!(table.record.round_results.is_empty());
        assert!(table.record.player(GUEST).unwrap().is_describer);
    }

    #[test]
    fn ready_quorum_after_full_rotation_starts_next_round() {
        let mut table = Table::new(2, &[GUEST]);
        table.start();
        table.switch(HOST).unwrap();
        table.guess(HOST, 10).unwrap();
        assert_eq!(table.phase(), GamePhase::Scoring);

        table.ready(GUEST).unwrap();
        let outcome = table.ready(HOST).unwrap();

        assert_eq!(
            outcome,
            ReadyOutcome::Advanced(TurnOutcome::Closed(RoundClosed {
                round: 1,
                finished: false
            }))
        );
        let game = &table.record.game;
        assert_eq!(game.phase, GamePhase::Playing);
        assert_eq!(game.current_round, 2);
        assert_eq!(game.describers_this_round, vec![HOST.to_string()]);
        assert!(game.players_ready_for_next_round.is_empty());
        assert_eq!(table.record.round_results.len(), 1);

        // Both described in round 1, so both earn the bonus.
        assert!(table.score_of(GUEST).round_scores[0].is_describer);
        assert!(table.score_of(HOST).round_scores[0].is_describer);
    }

    #[test]
    fn ready_quorum_on_last_round_finishes() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();
        table.switch(HOST).unwrap();
        table.guess(HOST, 10).unwrap();

        table.ready(HOST).unwrap();
        table.ready(GUEST).unwrap();

        assert_eq!(table.phase(), GamePhase::Finished);
    }

    #[test]
    fn ready_requires_scoring_and_a_known_player() {
        let mut table = Table::new(1, &[GUEST]);
        table.start();
        assert!(matches!(
            table.ready(GUEST).unwrap_err(),
            LifecycleError::InvalidState(_)
        ));

        table.guess(GUEST, 12).unwrap();
        assert!(matches!(
            table.ready("stranger").unwrap_err(),
            LifecycleError::NotFound(_)
        ));
    }

    #[test]
    fn every_round_restarts_with_the_anchor_player() {
        let mut table = Table::new(3, &[GUEST, LATE]);
        table.start();
        table.switch(HOST).unwrap();
        table.switch(GUEST).unwrap();
        table.switch(LATE).unwrap();

        assert_eq!(table.record.game.current_round, 2);
        assert_eq!(table.record.describer_id(), Some(HOST));
        assert!(table.record.player(HOST).unwrap().is_describer);
    }

    #[test]
    fn heartbeat_toggles_presence() {
        let mut table = Table::new(1, &[GUEST]);
        table.record.set_player_online(GUEST, false).unwrap();
        assert!(!table.record.player(GUEST).unwrap().is_online);
        assert!(matches!(
            table.record.set_player_online("stranger", true).unwrap_err(),
            LifecycleError::NotFound(_)
        ));
    }
}
