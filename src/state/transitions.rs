use rand::rngs::ThreadRng;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::GameRecord,
    error::ServiceError,
    services::sse_events::broadcast_game_updated,
    state::{GameUpdate, SharedState, game::Dealer, lifecycle::LifecycleError},
};

/// Execute a game operation and broadcast the committed snapshot.
///
/// The broadcast happens before the game's gate is released, so subscribers
/// see snapshots in commit order. Phase changes are logged here so every
/// mutation path reports them the same way.
pub async fn run_operation_with_broadcast<T, F>(
    state: &SharedState,
    game_id: Uuid,
    operation: F,
) -> Result<GameUpdate<T>, ServiceError>
where
    F: FnOnce(&mut GameRecord, &mut Dealer<'_, ThreadRng>) -> Result<T, LifecycleError>,
{
    state
        .run_game_operation_then(game_id, operation, |update| {
            if !update.changed {
                return;
            }

            let game = &update.record.game;
            if update.phase_before != game.phase {
                info!(
                    %game_id,
                    round = game.current_round,
                    from = ?update.phase_before,
                    to = ?game.phase,
                    "game phase changed"
                );
            }
            broadcast_game_updated(state, &update.record);
        })
        .await
}
