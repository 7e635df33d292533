//! In-process [`GameStore`] used for local runs and tests.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::GameRecord,
    storage::{StorageError, StorageResult},
};

/// Game store keeping every record in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<DashMap<Uuid, GameRecord>>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, record: GameRecord) -> StorageResult<()> {
        let id = record.game.id;
        match self.games.entry(id) {
            Entry::Occupied(_) => Err(StorageError::Conflict { id }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn update(&self, record: GameRecord, expected_version: u64) -> StorageResult<()> {
        let id = record.game.id;
        let Some(mut stored) = self.games.get_mut(&id) else {
            return Err(StorageError::Conflict { id });
        };

        if stored.version != expected_version {
            return Err(StorageError::Conflict { id });
        }

        *stored = record;
        Ok(())
    }

    fn find_by_room_code(&self, room_code: &str) -> Option<GameRecord> {
        self.games
            .iter()
            .filter(|entry| entry.game.room_code == room_code)
            .max_by_key(|entry| entry.game.created_at)
            .map(|entry| entry.value().clone())
    }
}

impl GameStore for MemoryGameStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert_game(&self, record: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.insert(record);
        Box::pin(async move { result })
    }

    fn update_game(
        &self,
        record: GameRecord,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.update(record, expected_version);
        Box::pin(async move { result })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let record = self.games.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(record) })
    }

    fn find_game_by_room_code(
        &self,
        room_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let record = self.find_by_room_code(&room_code);
        Box::pin(async move { Ok(record) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
