use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE hub.
pub struct ServerEvent {
    /// Game the event belongs to; `None` reaches every stream.
    pub game_id: Option<Uuid>,
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(game_id: Option<Uuid>, event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            game_id,
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Whether a stream following `game_id` should forward this event.
    pub fn concerns(&self, game_id: Uuid) -> bool {
        self.game_id.is_none_or(|id| id == game_id)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
