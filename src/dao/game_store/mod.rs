/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::GameRecord;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for game sessions.
///
/// Each game is stored as one [`GameRecord`]. Writes are compare-and-update on
/// the record version so two operations on the same game never interleave.
pub trait GameStore: Send + Sync {
    /// Short name of the backend, reported by the health route.
    fn backend_name(&self) -> &'static str;
    /// Persist a brand-new game; fails with `Conflict` when the id is taken.
    fn insert_game(&self, record: GameRecord) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace a game only if its stored version still equals `expected_version`.
    fn update_game(
        &self,
        record: GameRecord,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    /// Most recently created game using this room code.
    fn find_game_by_room_code(
        &self,
        room_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
