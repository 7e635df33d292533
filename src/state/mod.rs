/// Randomness and clock handed to engine operations.
pub mod game;
/// Round lifecycle engine over the game aggregate.
pub mod lifecycle;
/// Describer rotation order.
pub mod rotation;
/// Distance-based guess scoring.
pub mod scoring;
mod sse;
/// Phase transition table.
pub mod state_machine;
/// Operation runner that broadcasts committed snapshots.
pub mod transitions;

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use rand::rngs::ThreadRng;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, models::GameRecord},
    error::ServiceError,
    state::{game::Dealer, lifecycle::LifecycleError, state_machine::GamePhase},
};

pub use self::sse::SseHub;

/// Handle to the application state shared by every request.
pub type SharedState = Arc<AppState>;
/// Upper bound on the store work of one game operation.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);
const SSE_CAPACITY: usize = 64;

/// Outcome of an operation applied to a stored game.
#[derive(Debug)]
pub struct GameUpdate<T> {
    /// Value returned by the operation.
    pub value: T,
    /// Phase the game was in before the operation.
    pub phase_before: GamePhase,
    /// Record as it is now stored.
    pub record: GameRecord,
    /// Whether the operation wrote anything.
    pub changed: bool,
}

/// Central application state storing the store handle, SSE hub and per-game gates.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    sse: SseHub,
    game_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            sse: SseHub::new(SSE_CAPACITY),
            game_gates: DashMap::new(),
            config,
            degraded: degraded_tx,
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, failing with [`ServiceError::Degraded`] while degraded.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Broadcast hub used for the per-game SSE streams.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Load a game without taking its gate.
    pub async fn load_game(&self, game_id: Uuid) -> Result<GameRecord, ServiceError> {
        let store = self.require_game_store().await?;
        store
            .find_game(game_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))
    }

    /// Run `operation` against the stored game as one atomic step.
    ///
    /// Operations on the same game are serialised in-process; the write is a
    /// compare-and-update on the record version so a concurrent writer in
    /// another process surfaces as [`ServiceError::Conflict`]. Nothing is
    /// written when the operation fails or leaves the record untouched.
    pub async fn run_game_operation<T, F>(
        &self,
        game_id: Uuid,
        operation: F,
    ) -> Result<GameUpdate<T>, ServiceError>
    where
        F: FnOnce(&mut GameRecord, &mut Dealer<'_, ThreadRng>) -> Result<T, LifecycleError>,
    {
        self.run_game_operation_then(game_id, operation, |_| {})
            .await
    }

    /// Like [`AppState::run_game_operation`], calling `on_commit` with the
    /// outcome before the game's gate is released.
    ///
    /// Whatever `on_commit` publishes is therefore ordered the same way as the
    /// writes to the store.
    pub async fn run_game_operation_then<T, F, C>(
        &self,
        game_id: Uuid,
        operation: F,
        on_commit: C,
    ) -> Result<GameUpdate<T>, ServiceError>
    where
        F: FnOnce(&mut GameRecord, &mut Dealer<'_, ThreadRng>) -> Result<T, LifecycleError>,
        C: FnOnce(&GameUpdate<T>),
    {
        let gate = self.game_gate(game_id);
        let result = {
            let _guard = gate.lock().await;
            let result = self.commit_operation(game_id, operation).await;
            if let Ok(update) = &result {
                on_commit(update);
            }
            result
        };

        drop(gate);
        self.release_game_gate(game_id);
        result
    }

    async fn commit_operation<T, F>(
        &self,
        game_id: Uuid,
        operation: F,
    ) -> Result<GameUpdate<T>, ServiceError>
    where
        F: FnOnce(&mut GameRecord, &mut Dealer<'_, ThreadRng>) -> Result<T, LifecycleError>,
    {
        let work = async {
            let store = self.require_game_store().await?;
            let mut record = store
                .find_game(game_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
            let expected_version = record.version;
            let before = record.clone();

            let value = self.apply_operation(&mut record, operation).inspect_err(|err| {
                debug!(%game_id, error = %err, "game operation rejected");
            })?;

            let changed = record != before;
            if changed {
                record.version = expected_version + 1;
                store.update_game(record.clone(), expected_version).await?;
            }

            Ok(GameUpdate {
                value,
                phase_before: before.game.phase,
                record,
                changed,
            })
        };

        match self.transition_timeout {
            Some(limit) => timeout(limit, work)
                .await
                .map_err(|_| ServiceError::Timeout)?,
            None => work.await,
        }
    }

    fn apply_operation<T, F>(&self, record: &mut GameRecord, operation: F) -> Result<T, LifecycleError>
    where
        F: FnOnce(&mut GameRecord, &mut Dealer<'_, ThreadRng>) -> Result<T, LifecycleError>,
    {
        let mut rng = rand::rng();
        let mut dealer = Dealer::new(&mut rng, self.config.spectrum_pairs(), SystemTime::now());
        operation(record, &mut dealer)
    }

    fn game_gate(&self, game_id: Uuid) -> Arc<Mutex<()>> {
        self.game_gates.entry(game_id).or_default().clone()
    }

    /// Forget the gate once no operation holds or waits on it.
    fn release_game_gate(&self, game_id: Uuid) {
        self.game_gates
            .remove_if(&game_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::{
            game_store::memory::MemoryGameStore,
            models::GameEventKind,
            storage::{StorageError, StorageResult},
        },
        state::lifecycle::{ReadyOutcome, new_game},
    };

    async fn state_with_game() -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(MemoryGameStore::new());
        state.set_game_store(store.clone()).await;

        let game_id = Uuid::new_v4();
        let record = new_game(game_id, "QWERTY", "host", "Host", 2, SystemTime::now()).unwrap();
        store.insert_game(record).await.unwrap();
        (state, game_id)
    }

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        assert!(!state.is_degraded());

        state.clear_game_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn successful_change_bumps_the_version() {
        let (state, game_id) = state_with_game().await;

        let update = state
            .run_game_operation(game_id, |record, dealer| record.start_game("host", dealer))
            .await
            .unwrap();

        assert!(update.changed);
        assert_eq!(update.record.version, 1);
        let stored = state.load_game(game_id).await.unwrap();
        assert_eq!(stored, update.record);
    }

    #[tokio::test]
    async fn rejected_operation_writes_nothing() {
        let (state, game_id) = state_with_game().await;

        let err = state
            .run_game_operation(game_id, |record, dealer| record.start_game("guest", dealer))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(state.load_game(game_id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn no_op_leaves_the_version_alone() {
        let (state, game_id) = state_with_game().await;

        let update = state
            .run_game_operation(game_id, |record, dealer| {
                record.auto_submit_guesses(dealer.now())
            })
            .await
            .unwrap();

        assert!(!update.changed);
        assert_eq!(update.record.version, 0);
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let (state, _) = state_with_game().await;
        let err = state
            .run_game_operation(Uuid::new_v4(), |record, _| {
                record.set_player_online("host", true)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    /// Host plus two guessers, first round in play with the host describing.
    async fn playing_game() -> (SharedState, Uuid) {
        let (state, game_id) = state_with_game().await;
        for (user_id, username) in [("ana", "Ana"), ("bo", "Bo")] {
            state
                .run_game_operation(game_id, |record, dealer| {
                    record.join(user_id, username, dealer.now())
                })
                .await
                .unwrap();
        }
        state
            .run_game_operation(game_id, |record, dealer| record.start_game("host", dealer))
            .await
            .unwrap();
        (state, game_id)
    }

    fn round_ended_count(record: &GameRecord) -> usize {
        record
            .events
            .iter()
            .filter(|event| event.kind == GameEventKind::RoundEnded)
            .count()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_last_guesses_reveal_once() {
        let (state, game_id) = playing_game().await;

        let tasks: Vec<_> = [("ana", 10), ("bo", 14)]
            .into_iter()
            .map(|(player_id, value)| {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .run_game_operation(game_id, move |record, dealer| {
                            record.submit_guess(player_id, value, dealer.now())
                        })
                        .await
                })
            })
            .collect();

        let mut reveals = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().value.all_submitted {
                reveals += 1;
            }
        }
        assert_eq!(reveals, 1);

        let stored = state.load_game(game_id).await.unwrap();
        assert_eq!(stored.game.phase, GamePhase::Scoring);
        assert_eq!(round_ended_count(&stored), 1);
        assert_eq!(stored.current_round_guesses().count(), 2);
        assert_eq!(stored.version, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn timer_racing_the_last_guess_reveals_once() {
        let (state, game_id) = playing_game().await;
        state
            .run_game_operation(game_id, |record, dealer| {
                record.submit_guess("ana", 9, dealer.now())
            })
            .await
            .unwrap();

        let guess = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .run_game_operation(game_id, |record, dealer| {
                        record.submit_guess("bo", 15, dealer.now())
                    })
                    .await
            })
        };
        let timer = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .run_game_operation(game_id, |record, dealer| {
                        record.auto_submit_guesses(dealer.now())
                    })
                    .await
            })
        };

        // Whichever lands second finds the round already revealed.
        match guess.await.unwrap() {
            Ok(update) => assert!(update.value.all_submitted),
            Err(err) => assert!(matches!(err, ServiceError::InvalidState(_))),
        }
        timer.await.unwrap().unwrap();

        let stored = state.load_game(game_id).await.unwrap();
        assert_eq!(stored.game.phase, GamePhase::Scoring);
        assert_eq!(round_ended_count(&stored), 1);
        assert_eq!(
            stored
                .current_round_guesses()
                .filter(|guess| guess.player_id == "bo")
                .count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_ready_acknowledgements_rotate_once() {
        let (state, game_id) = playing_game().await;
        for (player_id, value) in [("ana", 10), ("bo", 14)] {
            state
                .run_game_operation(game_id, move |record, dealer| {
                    record.submit_guess(player_id, value, dealer.now())
                })
                .await
                .unwrap();
        }

        let tasks: Vec<_> = ["host", "ana", "bo"]
            .into_iter()
            .map(|player_id| {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .run_game_operation(game_id, move |record, dealer| {
                            record.mark_ready_for_next_round(player_id, dealer)
                        })
                        .await
                })
            })
            .collect();

        let mut advanced = 0;
        for task in tasks {
            if matches!(
                task.await.unwrap().unwrap().value,
                ReadyOutcome::Advanced(_)
            ) {
                advanced += 1;
            }
        }
        assert_eq!(advanced, 1);

        let stored = state.load_game(game_id).await.unwrap();
        assert_eq!(stored.game.phase, GamePhase::Playing);
        assert_eq!(stored.game.describers_this_round, vec!["host", "ana"]);
        assert_eq!(stored.describer_id(), Some("ana"));
        assert!(stored.game.players_ready_for_next_round.is_empty());
        assert_eq!(stored.current_round_guesses().count(), 0);
    }

    /// Store whose copy of every game has always moved on.
    struct StaleStore(MemoryGameStore);

    impl GameStore for StaleStore {
        fn backend_name(&self) -> &'static str {
            "stale"
        }

        fn insert_game(&self, record: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
            self.0.insert_game(record)
        }

        fn update_game(
            &self,
            record: GameRecord,
            _expected_version: u64,
        ) -> BoxFuture<'static, StorageResult<()>> {
            let id = record.game.id;
            Box::pin(async move { Err(StorageError::Conflict { id }) })
        }

        fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
            self.0.find_game(id)
        }

        fn find_game_by_room_code(
            &self,
            room_code: String,
        ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
            self.0.find_game_by_room_code(room_code)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.try_reconnect()
        }
    }

    #[tokio::test]
    async fn version_conflict_surfaces_and_writes_nothing() {
        let state = AppState::new(AppConfig::default());
        let backing = MemoryGameStore::new();
        state
            .set_game_store(Arc::new(StaleStore(backing.clone())))
            .await;

        let game_id = Uuid::new_v4();
        let record = new_game(game_id, "STALE1", "host", "Host", 2, SystemTime::now()).unwrap();
        backing.insert_game(record.clone()).await.unwrap();

        let mut committed = false;
        let err = state
            .run_game_operation_then(
                game_id,
                |record, dealer| record.start_game("host", dealer),
                |_| committed = true,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict));
        assert!(!committed);
        assert_eq!(backing.find_game(game_id).await.unwrap(), Some(record));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn gates_are_released_after_use() {
        let (state, game_id) = playing_game().await;
        assert!(state.game_gates.is_empty());

        let tasks: Vec<_> = ["host", "ana", "bo"]
            .into_iter()
            .map(|player_id| {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .run_game_operation(game_id, move |record, _| {
                            record.set_player_online(player_id, false)
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(state.game_gates.is_empty());
    }
}
