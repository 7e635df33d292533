/// Game session storage and retrieval operations.
pub mod game_store;
/// Persisted game aggregate definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
