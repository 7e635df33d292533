mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use store::CouchGameStore;

use error::CouchDaoError;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::RevisionConflict { id } => StorageError::Conflict { id },
            err => StorageError::unavailable(err.to_string(), err),
        }
    }
}
