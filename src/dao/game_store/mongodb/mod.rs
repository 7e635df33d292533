mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use store::MongoGameStore;

use error::MongoDaoError;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::VersionConflict { id } => StorageError::Conflict { id },
            err => StorageError::unavailable(err.to_string(), err),
        }
    }
}
