use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether games can be served, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.game_store().await else {
        warn!("storage unavailable (degraded mode)");
        return HealthResponse::new(true, "none");
    };

    if let Err(err) = store.health_check().await {
        warn!(error = %err, "storage health check failed");
    }

    HealthResponse::new(state.is_degraded(), store.backend_name())
}
