use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::GameRecord;

/// One game aggregate as stored in the `games` collection.
///
/// `room_code`, `created_at` and `version` are mirrored out of the record so
/// they can be indexed and used in update filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    room_code: String,
    created_at: DateTime,
    version: i64,
    record: GameRecord,
}

impl From<GameRecord> for MongoGameDocument {
    fn from(record: GameRecord) -> Self {
        Self {
            id: record.game.id.to_string(),
            room_code: record.game.room_code.clone(),
            created_at: DateTime::from_system_time(record.game.created_at),
            version: record.version as i64,
            record,
        }
    }
}

impl From<MongoGameDocument> for GameRecord {
    fn from(document: MongoGameDocument) -> Self {
        document.record
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

/// Filter matching a game only while it still holds `version`.
pub fn versioned_doc_id(id: Uuid, version: u64) -> Document {
    doc! { "_id": id.to_string(), "version": version as i64 }
}
