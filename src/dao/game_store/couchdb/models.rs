use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dao::models::GameRecord;

pub const GAME_PREFIX: &str = "game::";
pub const ROOM_CODE_INDEX: &str = "game-room-code-idx";

/// One game aggregate stored as a CouchDB document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub room_code: String,
    /// Creation time in milliseconds since the Unix epoch, sortable by Mango.
    #[serde(default)]
    pub created_at: u64,
    pub version: u64,
    pub record: GameRecord,
}

impl CouchGameDocument {
    pub fn new(record: GameRecord, rev: Option<String>) -> Self {
        Self {
            id: game_doc_id(record.game.id),
            rev,
            room_code: record.game.room_code.clone(),
            created_at: record
                .game
                .created_at
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_millis() as u64),
            version: record.version,
            record,
        }
    }
}

/// Response body of a Mango `_find` query.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<CouchGameDocument>,
}

pub fn game_doc_id(id: Uuid) -> String {
    format!("{GAME_PREFIX}{id}")
}

/// Latest game created with `room_code`.
pub fn room_code_query(room_code: &str) -> Value {
    json!({
        "selector": {
            "room_code": room_code,
            "created_at": { "$gte": 0 },
        },
        "sort": [{ "room_code": "desc" }, { "created_at": "desc" }],
        "limit": 1,
        "use_index": ROOM_CODE_INDEX,
    })
}

pub fn room_code_index() -> Value {
    json!({
        "index": { "fields": ["room_code", "created_at"] },
        "name": ROOM_CODE_INDEX,
        "type": "json",
    })
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::lifecycle::new_game;

    #[test]
    fn document_id_is_prefixed_and_rev_omitted_when_new() {
        let record = new_game(
            Uuid::new_v4(),
            "ROOM42",
            "host",
            "Host",
            2,
            SystemTime::now(),
        )
        .unwrap();
        let id = record.game.id;

        let document = CouchGameDocument::new(record, None);
        assert_eq!(document.id, format!("game::{id}"));

        let value = serde_json::to_value(&document).unwrap();
        assert!(value.get("_rev").is_none());
        assert_eq!(value["room_code"], "ROOM42");
    }

    #[test]
    fn room_lookup_returns_only_the_latest_game() {
        let created_at = UNIX_EPOCH + std::time::Duration::from_millis(1_700_000_000_123);
        let record = new_game(Uuid::new_v4(), "LATEST", "host", "Host", 2, created_at).unwrap();
        assert_eq!(
            CouchGameDocument::new(record, None).created_at,
            1_700_000_000_123
        );

        let query = room_code_query("LATEST");
        assert_eq!(query["selector"]["room_code"], "LATEST");
        assert_eq!(query["limit"], 1);
        assert_eq!(query["sort"][1]["created_at"], "desc");
        assert_eq!(
            room_code_index()["index"]["fields"],
            json!(["room_code", "created_at"])
        );
    }
}
